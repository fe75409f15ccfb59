//! Middlebury `.flo` motion-flow files.
//!
//! Layout (little-endian): the float tag `202021.25`, `i32` width, `i32`
//! height, then `height * width` interleaved `(x, y)` pairs of `f32`, row by
//! row. The search writes its displacement offsets in this format so they can
//! be inspected with standard optical-flow viewers.

use crate::image::Grid;
use crate::util::{OpalError, OpalResult};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic tag opening every flow file.
pub const FLOW_TAG: f32 = 202021.25;

/// Writes a flow field given as separate x and y component grids.
pub fn write_flow<P: AsRef<Path>>(
    path: P,
    flow_x: &Grid<i32>,
    flow_y: &Grid<i32>,
) -> OpalResult<()> {
    if !flow_x.same_shape(flow_y) {
        return Err(OpalError::ShapeMismatch {
            expected: flow_x.shape(),
            got: flow_y.shape(),
            context: "flow y component",
        });
    }
    let (height, width) = flow_x.shape();
    let dims = |v: usize| {
        i32::try_from(v).map_err(|_| OpalError::InvalidDimensions { height, width })
    };
    let w = dims(width)?;
    let h = dims(height)?;

    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(&FLOW_TAG.to_le_bytes())?;
    out.write_all(&w.to_le_bytes())?;
    out.write_all(&h.to_le_bytes())?;
    for (&x, &y) in flow_x.as_slice().iter().zip(flow_y.as_slice()) {
        out.write_all(&(x as f32).to_le_bytes())?;
        out.write_all(&(y as f32).to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// Size of the tag and the two dimension words.
const HEADER_BYTES: u64 = 12;

/// Reads a flow file into `(flow_x, flow_y)` grids.
///
/// The header dimensions must account for exactly the bytes that follow it.
pub fn read_flow<P: AsRef<Path>>(path: P) -> OpalResult<(Grid<f32>, Grid<f32>)> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut input = BufReader::new(file);
    let mut word = [0u8; 4];

    input.read_exact(&mut word)?;
    let tag = f32::from_le_bytes(word);
    if (tag - FLOW_TAG).abs() > 1e-4 {
        return Err(OpalError::InvalidFlow {
            reason: format!("bad tag {tag}"),
        });
    }
    input.read_exact(&mut word)?;
    let width = i32::from_le_bytes(word);
    input.read_exact(&mut word)?;
    let height = i32::from_le_bytes(word);
    let (Ok(width), Ok(height)) = (usize::try_from(width), usize::try_from(height)) else {
        return Err(OpalError::InvalidFlow {
            reason: format!("negative size {height}x{width}"),
        });
    };
    let expected = (height as u64)
        .checked_mul(width as u64)
        .and_then(|cells| cells.checked_mul(8));
    let available = file_len.saturating_sub(HEADER_BYTES);
    if expected != Some(available) {
        return Err(OpalError::InvalidFlow {
            reason: format!("header {height}x{width} does not match {available} data bytes"),
        });
    }

    let mut flow_x = Grid::filled(height, width, 0.0f32)?;
    let mut flow_y = Grid::filled(height, width, 0.0f32)?;
    for (x, y) in flow_x
        .as_mut_slice()
        .iter_mut()
        .zip(flow_y.as_mut_slice().iter_mut())
    {
        input.read_exact(&mut word)?;
        *x = f32::from_le_bytes(word);
        input.read_exact(&mut word)?;
        *y = f32::from_le_bytes(word);
    }
    Ok((flow_x, flow_y))
}

#[cfg(test)]
mod tests {
    use super::{read_flow, write_flow, FLOW_TAG};
    use crate::image::Grid;
    use crate::util::OpalError;
    use std::io::Write;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("opal-flow-{}-{name}", std::process::id()))
    }

    #[test]
    fn written_flow_reads_back() {
        let fx = Grid::from_vec(vec![1, -2, 3, 0, 5, -6], 2, 3).unwrap();
        let fy = Grid::from_vec(vec![-1, 0, 7, 2, -3, 4], 2, 3).unwrap();
        let path = temp_path("roundtrip.flo");
        write_flow(&path, &fx, &fy).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 12 + 2 * 3 * 8);
        assert_eq!(&bytes[0..4], &FLOW_TAG.to_le_bytes());

        let (rx, ry) = read_flow(&path).unwrap();
        assert_eq!(rx.shape(), (2, 3));
        assert_eq!(rx[(1, 2)], -6.0);
        assert_eq!(ry[(0, 2)], 7.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn mismatched_components_are_rejected() {
        let fx = Grid::filled(2, 2, 0).unwrap();
        let fy = Grid::filled(2, 3, 0).unwrap();
        let err = write_flow(temp_path("never.flo"), &fx, &fy).err().unwrap();
        assert!(matches!(err, OpalError::ShapeMismatch { .. }));
    }

    #[test]
    fn bad_tag_is_rejected() {
        let path = temp_path("badtag.flo");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&1.0f32.to_le_bytes()).unwrap();
        drop(file);
        assert!(matches!(
            read_flow(&path),
            Err(OpalError::InvalidFlow { .. })
        ));
        std::fs::remove_file(&path).ok();
    }

    fn write_header(path: &std::path::Path, width: i32, height: i32, data_bytes: usize) {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(&FLOW_TAG.to_le_bytes()).unwrap();
        file.write_all(&width.to_le_bytes()).unwrap();
        file.write_all(&height.to_le_bytes()).unwrap();
        file.write_all(&vec![0u8; data_bytes]).unwrap();
    }

    #[test]
    fn oversized_header_is_rejected() {
        let path = temp_path("oversized.flo");
        write_header(&path, i32::MAX, i32::MAX, 0);
        assert!(matches!(
            read_flow(&path),
            Err(OpalError::InvalidFlow { .. })
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn truncated_data_is_rejected() {
        let path = temp_path("truncated.flo");
        write_header(&path, 3, 2, 2 * 3 * 8 - 4);
        assert!(matches!(
            read_flow(&path),
            Err(OpalError::InvalidFlow { .. })
        ));

        write_header(&path, 3, 2, 2 * 3 * 8);
        let (fx, fy) = read_flow(&path).unwrap();
        assert_eq!(fx.shape(), (2, 3));
        assert_eq!(fy[(1, 2)], 0.0);
        std::fs::remove_file(&path).ok();
    }
}
