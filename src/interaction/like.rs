use crate::api::models::Post;

/// The viewer-relative like fields of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub count: u64,
}

impl LikeState {
    pub fn of(post: &Post) -> Self {
        Self {
            liked: post.is_liked,
            count: post.likes_count,
        }
    }

    /// Flip the flag and move the count with it. The count never drops below
    /// zero even if the server sent an inconsistent pair.
    pub fn toggled(self) -> Self {
        if self.liked {
            Self {
                liked: false,
                count: self.count.saturating_sub(1),
            }
        } else {
            Self {
                liked: true,
                count: self.count + 1,
            }
        }
    }

    pub fn apply_to(self, post: &mut Post) {
        post.is_liked = self.liked;
        post.likes_count = self.count;
    }
}
