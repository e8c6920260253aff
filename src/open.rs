//! The top-level consumer entry points (§6): open a file header, then
//! hand back its metadata alongside something that walks the rest of the
//! stream.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::container::ContainerIterator;
use crate::error::BlfResult;
use crate::file_header::{FileHeader, FileMeta};
use crate::reframe::Reframer;
use crate::source::{MappedSource, SequentialSource};

/// Reads the file header off `reader`, then returns its metadata and a
/// reframer positioned at the first log container. `reader` is consumed.
pub fn open_sequential<R: Read>(mut reader: R) -> BlfResult<(FileMeta, Reframer<SequentialSource<R>>)> {
    let header = FileHeader::read(&mut reader)?;
    let meta = header.meta();
    let containers = ContainerIterator::new(SequentialSource::new(reader));
    Ok((meta, Reframer::new(containers)))
}

/// Opens `path` for sequential, buffered reading.
pub fn open_path(path: &Path) -> BlfResult<(FileMeta, Reframer<SequentialSource<std::io::BufReader<File>>>)> {
    let file = File::open(path).map_err(|e| crate::error::BlfError::Io { offset: 0, source: e })?;
    open_sequential(std::io::BufReader::new(file))
}

/// Opens `path` as a memory-mapped random-access view, for the
/// non-streaming path that favors page-cache reuse over sequential I/O.
pub fn open_mapped(path: &Path) -> BlfResult<(FileMeta, Reframer<MappedSource>)> {
    use crate::source::ContainerByteSource;

    let file = File::open(path).map_err(|e| crate::error::BlfError::Io { offset: 0, source: e })?;
    let header = FileHeader::read(&mut &file)?;
    let meta = header.meta();

    let mut mapped = MappedSource::open(&file)?;
    // MappedSource addresses from offset 0; skip past the file header
    // bytes FileHeader::read already consumed.
    mapped.read_exact_or_eof(header.header_size as usize)?;

    let containers = ContainerIterator::new(mapped);
    Ok((meta, Reframer::new(containers)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::DecodedFrame;
    use crate::object_type::ObjectType;
    use crate::test_utils::{build_container, build_file_header, build_inner_object};

    #[test]
    fn opens_header_and_decodes_one_frame() {
        let mut body = Vec::new();
        body.extend_from_slice(&1u16.to_le_bytes()); // channel
        body.push(0); // flags
        body.push(8); // dlc
        body.extend_from_slice(&0x321u32.to_le_bytes()); // can_id
        body.extend_from_slice(&[0u8; 8]);

        let obj = build_inner_object(ObjectType::CanMessage, 0, 7, &body);
        let container = build_container(0, &obj);

        let mut bytes = build_file_header(1);
        bytes.extend(container);

        let (meta, reframer) = open_sequential(&bytes[..]).unwrap();
        assert_eq!(meta.object_count, 1);

        let mut frames = Vec::new();
        reframer
            .run(&mut |e: crate::reframe::Envelope<'_>| {
                if let Some(DecodedFrame::Can(f)) = e.frame {
                    frames.push(f.can_id);
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(frames, vec![0x321]);
    }
}
