//! Data preparation: labeled datasets, binary sample sets, sources.

pub mod prepare;
pub mod sample;
pub mod source;

pub use prepare::DatasetPreparer;
pub use sample::{LabeledDataset, SampleSet};
pub use source::{CsvSource, DataSource, DataSourceInfo, DataSourceType, SyntheticBlobs};
