use crate::post::{Post, PostDraft, PostEdit};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum FormField {
    #[default]
    Title,
    Content,
    ImageUrl,
    ImageFile,
    Submit,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Content,
            FormField::Content => FormField::ImageUrl,
            FormField::ImageUrl => FormField::ImageFile,
            FormField::ImageFile => FormField::Submit,
            FormField::Submit => FormField::Title,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            FormField::Title => FormField::Submit,
            FormField::Content => FormField::Title,
            FormField::ImageUrl => FormField::Content,
            FormField::ImageFile => FormField::ImageUrl,
            FormField::Submit => FormField::ImageFile,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            FormField::Title => "Title (required)",
            FormField::Content => "Content (optional)",
            FormField::ImageUrl => "Image URL (optional)",
            FormField::ImageFile => "Or upload an image (path)",
            FormField::Submit => "Create",
        }
    }
}

/// An uploaded file already converted to a data URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineImage {
    pub source: String,
    pub mime: String,
    pub size_bytes: usize,
    pub data_url: String,
}

/// State of the new-post form.
#[derive(Default, Debug)]
pub struct PostForm {
    pub active: FormField,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub image_path: String,
    upload: Option<InlineImage>,
    pending_upload: Option<u64>,
}

impl PostForm {
    pub fn focus(&mut self, field: FormField) {
        self.active = field;
    }

    pub fn next(&mut self) {
        self.active = self.active.next();
    }

    pub fn previous(&mut self) {
        self.active = self.active.previous();
    }

    fn active_value_mut(&mut self) -> Option<&mut String> {
        match self.active {
            FormField::Title => Some(&mut self.title),
            FormField::Content => Some(&mut self.content),
            FormField::ImageUrl => Some(&mut self.image_url),
            FormField::ImageFile => Some(&mut self.image_path),
            FormField::Submit => None,
        }
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Title => &self.title,
            FormField::Content => &self.content,
            FormField::ImageUrl => &self.image_url,
            FormField::ImageFile => &self.image_path,
            FormField::Submit => "",
        }
    }

    pub fn insert_char(&mut self, ch: char) {
        if let Some(value) = self.active_value_mut() {
            value.push(ch);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(value) = self.active_value_mut() {
            value.pop();
        }
    }

    pub fn clear_active(&mut self) {
        if let Some(value) = self.active_value_mut() {
            value.clear();
        }
    }

    /// Marks a file read as in flight and drops any earlier attachment. Only
    /// the most recent read may land.
    pub fn begin_upload(&mut self, request_id: u64) {
        self.upload = None;
        self.pending_upload = Some(request_id);
    }

    pub fn upload_pending(&self) -> bool {
        self.pending_upload.is_some()
    }

    /// Accepts a finished read if it is still the latest one requested.
    pub fn complete_upload(&mut self, request_id: u64, image: Option<InlineImage>) -> bool {
        if self.pending_upload != Some(request_id) {
            return false;
        }
        self.pending_upload = None;
        if let Some(image) = image {
            self.upload = Some(image);
        }
        true
    }

    pub fn upload(&self) -> Option<&InlineImage> {
        self.upload.as_ref()
    }

    /// Produces a draft and resets the form, or does nothing if the title is blank.
    pub fn submit(&mut self) -> Option<PostDraft> {
        if self.title.trim().is_empty() {
            return None;
        }
        let image_url = match self.upload.take() {
            Some(image) => image.data_url,
            None => std::mem::take(&mut self.image_url),
        };
        let draft = PostDraft {
            title: std::mem::take(&mut self.title),
            content: std::mem::take(&mut self.content),
            image_url,
        };
        *self = PostForm::default();
        Some(draft)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum EditField {
    #[default]
    Title,
    Content,
    ImageUrl,
    Save,
    Cancel,
}

impl EditField {
    pub fn next(self) -> Self {
        match self {
            EditField::Title => EditField::Content,
            EditField::Content => EditField::ImageUrl,
            EditField::ImageUrl => EditField::Save,
            EditField::Save => EditField::Cancel,
            EditField::Cancel => EditField::Title,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            EditField::Title => EditField::Cancel,
            EditField::Content => EditField::Title,
            EditField::ImageUrl => EditField::Content,
            EditField::Save => EditField::ImageUrl,
            EditField::Cancel => EditField::Save,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            EditField::Title => "Title",
            EditField::Content => "Content",
            EditField::ImageUrl => "Image URL",
            EditField::Save => "Save",
            EditField::Cancel => "Cancel",
        }
    }
}

/// Edit buffer seeded from a post when edit mode is entered. Later changes to
/// the post are not reflected here.
#[derive(Debug, Default)]
pub struct EditForm {
    pub active: EditField,
    pub values: PostEdit,
}

impl EditForm {
    pub fn seeded_from(post: &Post) -> Self {
        Self {
            active: EditField::Title,
            values: PostEdit::from(post),
        }
    }

    pub fn next(&mut self) {
        self.active = self.active.next();
    }

    pub fn previous(&mut self) {
        self.active = self.active.previous();
    }

    pub fn value(&self, field: EditField) -> &str {
        match field {
            EditField::Title => &self.values.title,
            EditField::Content => &self.values.content,
            EditField::ImageUrl => &self.values.image_url,
            EditField::Save | EditField::Cancel => "",
        }
    }

    fn active_value_mut(&mut self) -> Option<&mut String> {
        match self.active {
            EditField::Title => Some(&mut self.values.title),
            EditField::Content => Some(&mut self.values.content),
            EditField::ImageUrl => Some(&mut self.values.image_url),
            EditField::Save | EditField::Cancel => None,
        }
    }

    pub fn insert_char(&mut self, ch: char) {
        if let Some(value) = self.active_value_mut() {
            value.push(ch);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(value) = self.active_value_mut() {
            value.pop();
        }
    }

    pub fn into_edit(self) -> PostEdit {
        self.values
    }
}

#[derive(Debug, Default)]
pub struct CommentBox {
    pub text: String,
}

impl CommentBox {
    pub fn insert_char(&mut self, ch: char) {
        self.text.push(ch);
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    /// Returns the current text, blank or not, and clears the box.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}
