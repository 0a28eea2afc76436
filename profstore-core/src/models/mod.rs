pub mod result;

pub use result::ProfilerResult;
