//! Fixtures shared by the theme unit tests.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use chrono::TimeZone;

use crate::themes::loader::{FileLoader, LoadedFile};
use crate::themes::role::{Derivation, TemplateRole};
use crate::themes::shared::{self, SharedTheme};
use crate::themes::store::OverrideTemplate;
use crate::themes::DESCRIPTOR_FILE;
use crate::types::{DbId, Timestamp};

pub const BASIC_THEME: &str = r#"{
    "id": "basic",
    "name": "Basic",
    "description": "A plain theme",
    "author": "Theme Team",
    "preview_image": "preview.png",
    "dual_rendition": true,
    "stylesheet": {
        "name": "basic-css",
        "link": "basic.css",
        "renditions": [
            { "kind": "standard", "contents_file": "basic.css", "language": "css" }
        ]
    },
    "templates": [
        {
            "role": "weblog",
            "name": "weblog",
            "renditions": [
                { "kind": "standard", "contents_file": "weblog.html", "language": "thymeleaf" },
                { "kind": "mobile", "contents_file": "weblog-mobile.html", "language": "thymeleaf" }
            ]
        },
        {
            "role": "permalink",
            "name": "permalink",
            "hidden": true,
            "renditions": [
                { "kind": "standard", "contents_file": "permalink.html", "language": "thymeleaf" }
            ]
        },
        {
            "role": "custom_external",
            "name": "about",
            "link": "about",
            "navbar": true,
            "renditions": [
                { "kind": "standard", "contents_file": "about.html", "language": "thymeleaf" }
            ]
        }
    ]
}"#;

pub const BOLD_THEME: &str = r#"{
    "id": "bold",
    "name": "Bold",
    "templates": [
        {
            "role": "weblog",
            "name": "home",
            "renditions": [
                { "kind": "standard", "contents_file": "home.html", "language": "thymeleaf" }
            ]
        },
        {
            "role": "permalink",
            "name": "permalink",
            "renditions": [
                { "kind": "standard", "contents_file": "entry.html", "language": "thymeleaf" }
            ]
        },
        {
            "role": "custom_external",
            "name": "archive",
            "link": "archive",
            "renditions": [
                { "kind": "standard", "contents_file": "archive.html", "language": "thymeleaf" }
            ]
        }
    ]
}"#;

/// Fixed instant `n` minutes after a base time.
pub fn at(n: i64) -> Timestamp {
    chrono::Utc
        .timestamp_opt(1_700_000_000 + n * 60, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// In-memory [`FileLoader`].
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, LoadedFile>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, content: &str, last_modified: Timestamp) -> Self {
        self.insert_bytes(path, content.as_bytes().to_vec(), last_modified);
        self
    }

    pub fn insert_bytes(&mut self, path: &str, bytes: Vec<u8>, last_modified: Timestamp) {
        self.files.insert(
            path.to_string(),
            LoadedFile {
                bytes,
                last_modified,
            },
        );
    }

    pub fn remove(&mut self, path: &str) {
        self.files.remove(path);
    }
}

impl FileLoader for MemoryLoader {
    fn load(&self, relative_path: &str) -> io::Result<LoadedFile> {
        self.files
            .get(relative_path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, relative_path.to_string()))
    }
}

pub fn basic_theme() -> Arc<SharedTheme> {
    let loader = MemoryLoader::new()
        .with(DESCRIPTOR_FILE, BASIC_THEME, at(1))
        .with("basic.css", "body {}", at(2))
        .with("weblog.html", "<h1>home</h1>", at(3))
        .with("weblog-mobile.html", "<h1>m</h1>", at(3))
        .with("permalink.html", "<article/>", at(4))
        .with("about.html", "<p>about</p>", at(5))
        .with("preview.png", "png", at(1));
    Arc::new(shared::load(&loader, "basic").expect("basic fixture theme"))
}

pub fn bold_theme() -> Arc<SharedTheme> {
    let loader = MemoryLoader::new()
        .with(DESCRIPTOR_FILE, BOLD_THEME, at(1))
        .with("home.html", "<h1>bold</h1>", at(2))
        .with("entry.html", "<article class=bold/>", at(2))
        .with("archive.html", "<ul/>", at(2));
    Arc::new(shared::load(&loader, "bold").expect("bold fixture theme"))
}

pub fn override_template(
    id: DbId,
    weblog_id: DbId,
    name: &str,
    role: TemplateRole,
    derivation: Derivation,
) -> OverrideTemplate {
    OverrideTemplate {
        id,
        weblog_id,
        name: name.to_string(),
        role,
        derivation,
        description: String::new(),
        content: format!("<!-- {name} override -->"),
        language: "thymeleaf".to_string(),
        link: None,
        hidden: false,
        navbar: false,
        last_modified: at(10),
    }
}
