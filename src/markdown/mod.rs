pub mod blocks;
pub mod inline;

pub use blocks::{render_blocks, Block};
pub use inline::{render_inline, Inline};
