use std::path::Path;

use tokio::fs;
use tokio::task::JoinSet;

use tracing::warn;

use crate::error::Error;
use crate::templates::{EmailIndex, LayoutIndex, LocaleTemplates, Template};

/// Reserved folder holding shared layout templates.
pub const LAYOUTS_DIR: &str = "_layouts";

/// Files with this extension keep their source and are parsed on every
/// render. Any other extension is compiled when loaded.
pub const RAW_TEMPLATE_EXT: &str = "tera";

#[derive(Debug, Clone, Copy)]
enum Field {
    Html,
    Text,
    Subject,
}

impl Field {
    fn dir(self) -> &'static str {
        match self {
            Field::Html => "html",
            Field::Text => "text",
            Field::Subject => "subject",
        }
    }
}

/// Scan a template root and build the email and layout indices.
///
/// Layout: `root/<emailName>/{html,text,subject}/<locale>.<ext>` plus the
/// reserved `root/_layouts/<layoutName>.<ext>`. Entries prefixed with `_`
/// other than `_layouts` are ignored. Email directories load concurrently;
/// the first error encountered fails the whole load.
pub async fn load_directory(root: &Path) -> Result<(EmailIndex, LayoutIndex), Error> {
    let mut entries = fs::read_dir(root)
        .await
        .map_err(|e| Error::load(root, e))?;

    let mut tasks: JoinSet<Result<(String, LocaleTemplates), Error>> = JoinSet::new();
    let mut layouts = LayoutIndex::new();
    let mut first_err = None;

    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::load(root, e))? {
        let path = entry.path();

        let file_type = entry
            .file_type()
            .await
            .map_err(|e| Error::load(&path, e))?;

        if !file_type.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();

        if name == LAYOUTS_DIR {
            match load_layouts(&path).await {
                Ok(loaded) => layouts = loaded,
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
            continue;
        }

        if name.starts_with('_') {
            continue;
        }

        tasks.spawn(async move {
            let locales = load_email(&path).await?;
            Ok((name, locales))
        });
    }

    // Drain every task before surfacing a failure.
    let mut emails = EmailIndex::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok((name, locales))) => {
                emails.insert(name, locales);
            }
            Ok(Err(e)) => {
                first_err.get_or_insert(e);
            }
            Err(e) => {
                first_err.get_or_insert(Error::Join(e));
            }
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok((emails, layouts)),
    }
}

async fn load_email(email_dir: &Path) -> Result<LocaleTemplates, Error> {
    let (html, text, subject) = tokio::join!(
        load_field(email_dir, Field::Html),
        load_field(email_dir, Field::Text),
        load_field(email_dir, Field::Subject),
    );

    let mut locales = LocaleTemplates::new();

    for (field, loaded) in [
        (Field::Html, html?),
        (Field::Text, text?),
        (Field::Subject, subject?),
    ] {
        for (locale, template) in loaded {
            let entry = locales.entry(locale).or_default();
            match field {
                Field::Html => entry.html = Some(template),
                Field::Text => entry.text = Some(template),
                Field::Subject => entry.subject = Some(template),
            }
        }
    }

    Ok(locales)
}

async fn load_field(email_dir: &Path, field: Field) -> Result<Vec<(String, Template)>, Error> {
    let dir = email_dir.join(field.dir());

    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(_) => {
            warn!("no {} templates under {}", field.dir(), email_dir.display());
            return Ok(Vec::new());
        }
    };

    let mut templates = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::load(&dir, e))? {
        let path = entry.path();

        let file_type = entry
            .file_type()
            .await
            .map_err(|e| Error::load(&path, e))?;

        if !file_type.is_file() {
            continue;
        }

        let Some(locale) = file_stem(&path) else {
            continue;
        };

        let source = fs::read_to_string(&path)
            .await
            .map_err(|e| Error::load(&path, e))?;

        let template = if is_raw(&path) {
            Template::Raw(source)
        } else {
            let display = path.display().to_string();
            Template::compile(&display, &source).map_err(|e| Error::template(display, e))?
        };

        templates.push((locale, template));
    }

    Ok(templates)
}

async fn load_layouts(dir: &Path) -> Result<LayoutIndex, Error> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| Error::load(dir, e))?;

    let mut layouts = LayoutIndex::new();

    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::load(dir, e))? {
        let path = entry.path();

        let file_type = entry
            .file_type()
            .await
            .map_err(|e| Error::load(&path, e))?;

        if !file_type.is_file() {
            continue;
        }

        let Some(name) = file_stem(&path) else {
            continue;
        };

        let source = fs::read_to_string(&path)
            .await
            .map_err(|e| Error::load(&path, e))?;

        let display = path.display().to_string();
        let template = Template::compile(&display, &source).map_err(|e| Error::template(display, e))?;

        layouts.insert(name, template);
    }

    Ok(layouts)
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_owned)
}

fn is_raw(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(RAW_TEMPLATE_EXT)
}
