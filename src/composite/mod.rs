//! Composite combinators: structures built out of other `Construct`s.

pub mod array;
pub mod branch;
pub mod focused_seq;
pub mod modifiers;
pub mod pointer;
pub mod prefixed;
pub mod struct_;
pub mod switch;

pub use array::{Array, GreedyRange, PrefixedArray};
pub use branch::{If, IfThenElse};
pub use focused_seq::FocusedSeq;
pub use modifiers::{Aligned, Bitwise, Bytewise, Default, Rebuild, Renamed};
pub use pointer::{Area, Pointer};
pub use prefixed::{Compressed, Prefixed, Tunnel};
pub use struct_::Struct;
pub use switch::Switch;
