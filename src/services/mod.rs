pub mod batch;
pub mod container;
pub mod quantizer;
pub mod transcoder;

pub use batch::{BatchDriver, BatchReport, BatchState};
pub use container::{
    pack_smrf, pack_text, unpack_smrf, Origin, OutputFormat, OutputSettings, PayloadStats,
    SmrfHeader,
};
pub use quantizer::{FrameQuantizer, QuantizeOptions};
pub use transcoder::{ExtractRequest, Transcoder};
