pub mod cover;
pub mod excel_read;
pub mod excel_write;
