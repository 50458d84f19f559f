mod compact;
mod projection;
mod promising;

pub use compact::CompactMatchIndex;
pub use projection::{Projection, SeqMatch};
pub use promising::PromisingItemIndex;
