use rand::distributions::Uniform;
use rand::Rng;

const ID_LEN: usize = 11;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const DATA_URL_PREFIX: &str = "data:";

/// A single hobby post. Owned exclusively by the [`crate::store::PostStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image_url: String,
    /// Epoch milliseconds, set once at creation.
    pub created_at: i64,
    pub upvotes: u64,
    pub comments: Vec<String>,
}

impl Post {
    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }

    pub fn has_inline_image(&self) -> bool {
        self.image_url.starts_with(DATA_URL_PREFIX)
    }
}

/// Input for a new post, as handed over by the creation form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub image_url: String,
}

impl PostDraft {
    pub fn new<T, C, I>(title: T, content: C, image_url: I) -> Self
    where
        T: Into<String>,
        C: Into<String>,
        I: Into<String>,
    {
        Self {
            title: title.into(),
            content: content.into(),
            image_url: image_url.into(),
        }
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Replacement values for the editable fields of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostEdit {
    pub title: String,
    pub content: String,
    pub image_url: String,
}

impl From<&Post> for PostEdit {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            image_url: post.image_url.clone(),
        }
    }
}

pub fn generate_id<R: Rng>(rng: &mut R) -> String {
    let dist = Uniform::from(0..ID_ALPHABET.len());
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.sample(dist)] as char)
        .collect()
}

/// Splits a `data:<mime>;base64,<payload>` URL into its MIME type and decoded size.
pub fn describe_data_url(url: &str) -> Option<(String, usize)> {
    let rest = url.strip_prefix(DATA_URL_PREFIX)?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header
        .split(';')
        .next()
        .filter(|mime| !mime.is_empty())
        .unwrap_or("application/octet-stream");
    let padding = payload.bytes().rev().take_while(|b| *b == b'=').count();
    let size = (payload.len() / 4 * 3).saturating_sub(padding);
    Some((mime.to_string(), size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ids_are_base36_and_fixed_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = generate_id(&mut rng);
        assert_eq!(id.len(), ID_LEN);
        assert!(id
            .chars()
            .all(|ch| ch.is_ascii_digit() || ch.is_ascii_lowercase()));
    }

    #[test]
    fn blank_titles_are_detected() {
        assert!(!PostDraft::new("   \t", "", "").has_title());
        assert!(PostDraft::new(" Knitting ", "", "").has_title());
    }

    #[test]
    fn data_url_description() {
        let (mime, size) = describe_data_url("data:image/png;base64,iVBORw==").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(size, 4);
        assert!(describe_data_url("https://example.com/cat.png").is_none());
    }
}
