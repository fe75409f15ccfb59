use opal::{Grid, OpalError, PatchDistance};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_grid(rng: &mut StdRng, height: usize, width: usize) -> Grid<f64> {
    let data = (0..height * width)
        .map(|_| rng.random_range(0.0..255.0))
        .collect();
    Grid::from_vec(data, height, width).unwrap()
}

#[test]
fn random_shifts_match_fresh_evaluation() {
    let mut rng = StdRng::seed_from_u64(7);
    let fixed = random_grid(&mut rng, 24, 31);
    let moving = random_grid(&mut rng, 24, 31);
    let radius = 2;

    let mut d = PatchDistance::new(&fixed, (10, 12), &moving, (8, 15), radius).unwrap();
    for _ in 0..400 {
        let step = rng.random_range(0..4);
        let result = match step {
            0 => d.shift_right(),
            1 => d.shift_left(),
            2 => d.shift_down(),
            _ => d.shift_up(),
        };
        let fresh = PatchDistance::new(
            &fixed,
            d.fixed_center(),
            &moving,
            d.moving_center(),
            radius,
        )
        .unwrap();
        match result {
            Ok(value) => assert!((value - fresh.value()).abs() < 1e-5),
            Err(err) => assert!(matches!(err, OpalError::ShiftOutOfBounds { .. })),
        }
        assert!((d.value() - fresh.value()).abs() < 1e-5);
    }
}

#[test]
fn shift_at_edge_fails_and_keeps_state() {
    let grid = Grid::filled(6, 6, 3.0).unwrap();
    let other = Grid::filled(6, 6, 5.0).unwrap();
    let mut d = PatchDistance::new(&grid, (1, 4), &other, (4, 1), 1).unwrap();

    assert_eq!(
        d.shift_up().err().unwrap(),
        OpalError::ShiftOutOfBounds { direction: "up" }
    );
    assert_eq!(
        d.shift_left().err().unwrap(),
        OpalError::ShiftOutOfBounds { direction: "left" }
    );
    assert_eq!(d.fixed_center(), (1, 4));
    assert_eq!(d.moving_center(), (4, 1));
    assert_eq!(d.value(), 36.0);
}

#[test]
fn construction_rejects_patch_outside_grid() {
    let grid = Grid::filled(5, 5, 0.0).unwrap();
    let err = PatchDistance::new(&grid, (0, 2), &grid, (2, 2), 1)
        .err()
        .unwrap();
    assert!(matches!(err, OpalError::PatchOutOfBounds { row: 0, col: 2, .. }));
}
