pub mod bounds;
pub mod efficacy;
pub mod ordering;
pub mod source;
pub mod transmission;

pub use bounds::Bounds;
pub use efficacy::{parse_efficacy, read_efficacy, EfficacyRecord};
pub use ordering::{parse_ordering, read_ordering};
pub use source::{read_text, write_text, Compression};
pub use transmission::{parse_transmissions, read_transmissions, Infector, TransmissionEvent};
