mod filesystem;

pub use filesystem::VsfsFuse;
