use std::fmt;

const POST_PREFIX: &str = "/post/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Feed,
    Post { id: String },
}

impl Route {
    pub fn post(id: impl Into<String>) -> Self {
        Route::Post { id: id.into() }
    }

    /// Parses `/` or `/post/{id}`. Anything else is not a known address.
    pub fn parse(address: &str) -> Option<Self> {
        let address = address.trim();
        if address == "/" || address.is_empty() {
            return Some(Route::Feed);
        }
        let id = address.strip_prefix(POST_PREFIX)?;
        let id = id.strip_suffix('/').unwrap_or(id);
        if id.is_empty() || id.contains('/') {
            return None;
        }
        Some(Route::post(id))
    }

    pub fn path(&self) -> String {
        match self {
            Route::Feed => "/".to_string(),
            Route::Post { id } => format!("{POST_PREFIX}{id}"),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Browsing history with a cursor, like a browser tab's back/forward stack.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Route>,
    cursor: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Route::Feed)
    }
}

impl History {
    pub fn new(start: Route) -> Self {
        Self {
            entries: vec![start],
            cursor: 0,
        }
    }

    pub fn current(&self) -> &Route {
        &self.entries[self.cursor]
    }

    /// Navigates to `route`, discarding any forward entries.
    pub fn push(&mut self, route: Route) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(route);
        self.cursor = self.entries.len() - 1;
    }

    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }
}
