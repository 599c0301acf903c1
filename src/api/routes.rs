//! Endpoint descriptors, one per operation kind

use crate::task::Completion;

/// Task endpoints of one operation
///
/// Status polls go to `{task}/{task_id}`, clean-asset lookups to
/// `{image_url}/{task_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Task creation path, also the prefix of status polls
    pub task: &'static str,
    /// Watermark-free asset path; `None` when the operation has no watermark
    pub image_url: Option<&'static str>,
    /// When a status poll counts as finished
    pub completion: Completion,
}

impl Route {
    pub const ENHANCE: Route = Route {
        task: "/tasks/login/scale",
        image_url: Some("/tasks/login/image-url/scale"),
        completion: Completion::Progress,
    };

    pub const REMOVE_BACKGROUND: Route = Route {
        task: "/tasks/login/segmentation",
        image_url: Some("/tasks/login/image-url/segmentation"),
        completion: Completion::Progress,
    };

    pub const OCR: Route = Route {
        task: "/tasks/login/document/ocr",
        image_url: None,
        completion: Completion::Field("image"),
    };

    pub const COLORIZE: Route = Route {
        task: "/tasks/login/colorization",
        image_url: Some("/tasks/login/image-url/colorization"),
        completion: Completion::Field("image"),
    };

    pub const TEXT_TO_IMAGE: Route = Route {
        task: "/tasks/login/text-to-image",
        image_url: None,
        completion: Completion::Field("images"),
    };

    pub const EXPAND: Route = Route {
        task: "/tasks/login/image-expand",
        image_url: Some("/tasks/login/image-url/image-expand"),
        completion: Completion::Field("image1"),
    };

    pub fn status_path(&self, task_id: &str) -> String {
        format!("{}/{}", self.task, task_id)
    }

    pub fn image_url_path(&self, task_id: &str) -> Option<String> {
        self.image_url.map(|p| format!("{}/{}", p, task_id))
    }
}

/// Path of the upload authorization endpoint
pub const OSS_AUTHORIZATION_PATH: &str = "/authorizations/oss";
