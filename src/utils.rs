//! Matrix layout helpers and `.fvecs` I/O.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use aligned_vec::{AVec, CACHELINE_ALIGN};
use bytemuck::Pod;

/// Flatten a list of vectors into one cache-aligned row-major buffer.
pub fn as_continuous_vec<T: Copy>(mat: &[Vec<T>]) -> AVec<T> {
    AVec::from_iter(CACHELINE_ALIGN, mat.iter().flat_map(|v| v.iter().copied()))
}

/// Split a row-major buffer into rows of `dim`.
pub fn as_matrix<T: Copy>(vecs: &[T], dim: usize) -> Vec<Vec<T>> {
    vecs.chunks(dim).map(|row| row.to_vec()).collect()
}

/// Copy the rows at `indices` out of a row-major buffer, keeping the index order.
pub fn gather_rows<T: Copy>(vecs: &[T], dim: usize, indices: &[usize]) -> Vec<Vec<T>> {
    indices
        .iter()
        .map(|&i| vecs[i * dim..(i + 1) * dim].to_vec())
        .collect()
}

/// Read vectors from a `.fvecs`/`.ivecs` style file.
///
/// Every record is a little-endian `u32` dimension followed by that many values.
pub fn read_vecs<T: Pod>(path: &Path) -> io::Result<Vec<Vec<T>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut header = [0u8; 4];
    let mut vecs = Vec::new();

    loop {
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err),
        }
        let dim = u32::from_le_bytes(header) as usize;
        let mut vec = vec![T::zeroed(); dim];
        reader.read_exact(bytemuck::cast_slice_mut(&mut vec))?;
        vecs.push(vec);
    }

    Ok(vecs)
}

/// Write vectors to a `.fvecs`/`.ivecs` style file.
pub fn write_vecs<T: Pod>(path: &Path, vecs: &[Vec<T>]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for vec in vecs {
        writer.write_all(&(vec.len() as u32).to_le_bytes())?;
        writer.write_all(bytemuck::cast_slice(vec))?;
    }
    writer.flush()
}

#[cfg(test)]
mod test {
    use super::{as_continuous_vec, as_matrix, gather_rows, read_vecs, write_vecs};

    #[test]
    fn test_layout() {
        let mat = vec![vec![1.0f32, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let flat = as_continuous_vec(&mat);
        assert_eq!(&*flat, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(as_matrix(&flat, 2), mat);
        assert_eq!(
            gather_rows(&flat, 2, &[2, 0]),
            vec![vec![5.0, 6.0], vec![1.0, 2.0]]
        );
    }

    #[test]
    fn test_fvecs_file() {
        let path = std::env::temp_dir().join(format!("coreset-{}.fvecs", std::process::id()));
        let vecs = vec![vec![0.5f32, -1.0, 2.0], vec![3.0, 4.0, 5.5]];
        write_vecs(&path, &vecs).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * (4 + 3 * 4));
        assert_eq!(read_vecs::<f32>(&path).unwrap(), vecs);
        std::fs::remove_file(&path).unwrap();
    }
}
