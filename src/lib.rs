//! Parser and streaming decode pipeline for binary vehicle-bus log files.

pub mod container;
pub mod error;
pub mod file_header;
pub mod frames;
pub mod object_header;
pub mod object_type;
pub mod open;
pub mod pipeline;
pub mod reframe;
pub mod ring_buffer;
pub mod source;

#[cfg(test)]
mod test_utils;

pub use container::ContainerIterator;
pub use error::{BlfError, BlfResult};
pub use file_header::{FileHeader, FileMeta};
pub use frames::{CanFrame, DecodedFrame, EthernetFrame};
pub use object_header::{BaseHeader, ExtendedHeader};
pub use object_type::ObjectType;
pub use open::{open_mapped, open_path, open_sequential};
pub use pipeline::{PipelineConfig, PipelineDriver};
pub use reframe::{drain_ring, Envelope, FrameSink, Reframer};
pub use ring_buffer::RingBuffer;
pub use source::{ContainerByteSource, MappedSource, ReadOutcome, SequentialSource};
