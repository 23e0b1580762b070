pub mod profile_dto;

pub use profile_dto::{DepartmentDto, DepartmentMemberDto, UserProfileResponseDto};
