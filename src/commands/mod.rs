pub mod clear_cache;
pub mod list;
pub mod mutate;
pub mod show;
pub mod update_all;

pub use clear_cache::*;
pub use list::*;
pub use mutate::*;
pub use show::*;
pub use update_all::*;
