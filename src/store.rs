use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::post::{self, Post, PostDraft, PostEdit};

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Created { id: String },
    Upvoted { id: String, upvotes: u64 },
    Commented { id: String, count: usize },
    Edited { id: String },
    Deleted { id: String },
}

/// In-memory collection of posts, newest first.
///
/// Every operation is keyed by post id and silently ignores ids that are not
/// present. Applied mutations bump [`PostStore::revision`] and are announced
/// to subscribers.
pub struct PostStore {
    posts: Vec<Post>,
    clock: Box<dyn Clock>,
    revision: u64,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl Default for PostStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PostStore {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            posts: Vec::new(),
            clock,
            revision: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn get(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Inserts a new post at the front. Returns `None` when the title is blank.
    pub fn create(&mut self, draft: PostDraft) -> Option<String> {
        if !draft.has_title() {
            tracing::debug!("refusing to create post with blank title");
            return None;
        }

        let id = self.unused_id();
        let post = Post {
            id: id.clone(),
            title: draft.title,
            content: draft.content,
            image_url: draft.image_url,
            created_at: self.clock.now_millis(),
            upvotes: 0,
            comments: Vec::new(),
        };
        tracing::debug!(id = %id, title = %post.title, "created post");
        self.posts.insert(0, post);
        self.commit(StoreEvent::Created { id: id.clone() });
        Some(id)
    }

    pub fn upvote(&mut self, id: &str) -> bool {
        let Some(post) = self.find_mut(id) else {
            return false;
        };
        post.upvotes = post.upvotes.saturating_add(1);
        let upvotes = post.upvotes;
        tracing::debug!(id, upvotes, "upvoted post");
        self.commit(StoreEvent::Upvoted {
            id: id.to_string(),
            upvotes,
        });
        true
    }

    /// Appends `text` verbatim, blank strings included.
    pub fn add_comment(&mut self, id: &str, text: impl Into<String>) -> bool {
        let Some(post) = self.find_mut(id) else {
            return false;
        };
        post.comments.push(text.into());
        let count = post.comments.len();
        tracing::debug!(id, count, "added comment");
        self.commit(StoreEvent::Commented {
            id: id.to_string(),
            count,
        });
        true
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let Some(index) = self.posts.iter().position(|post| post.id == id) else {
            return false;
        };
        self.posts.remove(index);
        tracing::debug!(id, "deleted post");
        self.commit(StoreEvent::Deleted { id: id.to_string() });
        true
    }

    /// Replaces title, content and image. The title is not re-validated here.
    pub fn edit(&mut self, id: &str, edit: PostEdit) -> bool {
        let Some(post) = self.find_mut(id) else {
            return false;
        };
        post.title = edit.title;
        post.content = edit.content;
        post.image_url = edit.image_url;
        tracing::debug!(id, "edited post");
        self.commit(StoreEvent::Edited { id: id.to_string() });
        true
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Post> {
        self.posts.iter_mut().find(|post| post.id == id)
    }

    fn unused_id(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let id = post::generate_id(&mut rng);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn commit(&mut self, event: StoreEvent) {
        self.revision = self.revision.wrapping_add(1);
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
