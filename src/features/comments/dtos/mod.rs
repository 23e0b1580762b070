pub mod comment_dto;

pub use comment_dto::{
    CommentDto, CommentFeedDto, CommentQuery, CommentStatsDto, CreateCommentDto, ReactDto,
    ReplyDto, UpdateCommentDto,
};
