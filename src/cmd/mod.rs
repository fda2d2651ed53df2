pub mod mapper;
pub mod reducer;
