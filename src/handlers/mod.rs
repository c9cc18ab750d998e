pub mod records;
pub mod whoami;
