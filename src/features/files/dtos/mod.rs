pub mod file_dto;

pub use file_dto::{
    BulkDeleteFilesDto, DeleteFilesResponseDto, DownloadUrlDto, FileListQuery, FileResponseDto,
    FileStatsDto, UploadFileDto, UploadQuery, MAX_FILE_SIZE,
};
