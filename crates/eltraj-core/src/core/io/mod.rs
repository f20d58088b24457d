pub mod boxfile;
pub mod npy;
pub mod traits;
pub mod xyz;
