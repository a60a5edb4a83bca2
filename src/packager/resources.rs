//! Installer UI resources: markdown panels and background artwork.

use super::error::{Error, ErrorExt, Result};
use super::request::DistributionMetadata;
use super::utils::fs;
use pulldown_cmark::{Parser, html};
use std::path::{Path, PathBuf};

const HTML_HEAD: &str = "<!DOCTYPE html>\n<html>\n<head>\n<style>\nbody { font-family: -apple-system; }\n</style>\n</head>\n<body>\n";
const HTML_TAIL: &str = "</body>\n</html>\n";

/// Text panels shown by the installer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Panel {
    /// Welcome pane
    Welcome,
    /// Read Me pane
    Readme,
    /// License pane
    License,
}

impl Panel {
    /// File name inside the resources directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Panel::Welcome => "WELCOME.html",
            Panel::Readme => "README.html",
            Panel::License => "LICENSE.html",
        }
    }

    /// Element name in the distribution descriptor.
    pub fn element_name(&self) -> &'static str {
        match self {
            Panel::Welcome => "welcome",
            Panel::Readme => "readme",
            Panel::License => "license",
        }
    }
}

/// Renders markdown into the HTML document the installer displays.
pub fn render_markdown_panel(markdown: &str) -> String {
    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, Parser::new(markdown));

    let mut document = String::with_capacity(HTML_HEAD.len() + body.len() + HTML_TAIL.len());
    document.push_str(HTML_HEAD);
    document.push_str(&body);
    document.push_str(HTML_TAIL);
    document
}

/// Which background files get staged and how the descriptor refers to them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackgroundPlan {
    /// Source image → file name inside the resources directory
    pub copies: Vec<(PathBuf, String)>,
    /// File referenced by the `background` element
    pub light: Option<String>,
    /// File referenced by the `background-darkAqua` element
    pub dark: Option<String>,
}

impl BackgroundPlan {
    /// Decides the staged files for the given light and dark images.
    ///
    /// A missing dark image reuses the light one, as does a dark image at the
    /// same path. Extensions are preserved.
    pub fn new(light: Option<&Path>, dark: Option<&Path>) -> Self {
        match (light, dark) {
            (None, None) => Self::default(),
            (Some(light), None) => Self::single(light),
            (Some(light), Some(dark)) if light == dark => Self::single(light),
            (Some(light), Some(dark)) => {
                let light_name = background_file_name("BACKGROUND", light);
                let dark_name = background_file_name("BACKGROUND-DARK", dark);
                Self {
                    copies: vec![
                        (light.to_path_buf(), light_name.clone()),
                        (dark.to_path_buf(), dark_name.clone()),
                    ],
                    light: Some(light_name),
                    dark: Some(dark_name),
                }
            }
            (None, Some(dark)) => {
                let dark_name = background_file_name("BACKGROUND-DARK", dark);
                Self {
                    copies: vec![(dark.to_path_buf(), dark_name.clone())],
                    light: None,
                    dark: Some(dark_name),
                }
            }
        }
    }

    fn single(light: &Path) -> Self {
        let name = background_file_name("BACKGROUND", light);
        Self {
            copies: vec![(light.to_path_buf(), name.clone())],
            light: Some(name.clone()),
            dark: Some(name),
        }
    }

    /// True when no background is configured.
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }
}

fn background_file_name(stem: &str, source: &Path) -> String {
    match source.extension() {
        Some(ext) => format!("{}.{}", stem, ext.to_string_lossy()),
        None => stem.to_string(),
    }
}

/// Resources staged for one distribution build.
#[derive(Clone, Debug, Default)]
pub struct PreparedResources {
    /// Panels written to the resources directory, in descriptor order
    pub panels: Vec<Panel>,
    /// Background files and references
    pub backgrounds: BackgroundPlan,
}

/// Writes the HTML panels for the provided markdown texts.
pub async fn stage_panels(metadata: &DistributionMetadata, resources_dir: &Path) -> Result<Vec<Panel>> {
    let texts = [
        (Panel::Welcome, metadata.welcome.as_deref()),
        (Panel::Readme, metadata.readme.as_deref()),
        (Panel::License, metadata.license.as_deref()),
    ];

    let mut staged = Vec::new();
    for (panel, text) in texts {
        let Some(text) = text else { continue };

        fs::create_dir_all(resources_dir, false).await?;
        let path = resources_dir.join(panel.file_name());
        tokio::fs::write(&path, render_markdown_panel(text))
            .await
            .fs_context("writing installer panel", &path)?;
        log::debug!("Wrote {}", path.display());
        staged.push(panel);
    }
    Ok(staged)
}

/// Copies the planned background images into the resources directory.
///
/// Every source is checked before anything is copied.
pub async fn stage_backgrounds(plan: &BackgroundPlan, resources_dir: &Path) -> Result<()> {
    if let Some((missing, _)) = plan.copies.iter().find(|(source, _)| !source.exists()) {
        return Err(Error::ImageNotFound(missing.clone()));
    }

    for (source, name) in &plan.copies {
        fs::copy_file(source, &resources_dir.join(name)).await?;
        log::debug!("Staged background {} as {}", source.display(), name);
    }
    Ok(())
}

/// Stages every panel and background described by `metadata`.
pub async fn prepare_resources(
    metadata: &DistributionMetadata,
    resources_dir: &Path,
) -> Result<PreparedResources> {
    let backgrounds = BackgroundPlan::new(
        metadata.background.as_deref(),
        metadata.background_dark.as_deref(),
    );
    stage_backgrounds(&backgrounds, resources_dir).await?;
    let panels = stage_panels(metadata, resources_dir).await?;

    // productbuild --resources needs the directory even when it is empty.
    fs::create_dir_all(resources_dir, false).await?;

    if !panels.is_empty() || !backgrounds.is_empty() {
        log::info!(
            "✓ Prepared {} panel(s) and {} background file(s)",
            panels.len(),
            backgrounds.copies.len()
        );
    }
    Ok(PreparedResources {
        panels,
        backgrounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_panel_shell() {
        let html = render_markdown_panel("# Welcome\n\nThanks for installing.");
        assert!(html.starts_with("<!DOCTYPE html>\n<html>\n<head>\n<style>\nbody { font-family: -apple-system; }"));
        assert!(html.contains("<h1>Welcome</h1>"));
        assert!(html.contains("<p>Thanks for installing.</p>"));
        assert!(html.ends_with("</body>\n</html>\n"));
    }

    #[test]
    fn test_markdown_rendering_is_deterministic() {
        let text = "* one\n* two\n\n**bold**";
        assert_eq!(render_markdown_panel(text), render_markdown_panel(text));
    }

    #[test]
    fn test_light_only_reuses_light_for_dark() {
        let plan = BackgroundPlan::new(Some(Path::new("art/bg.png")), None);
        assert_eq!(plan.copies, vec![(PathBuf::from("art/bg.png"), "BACKGROUND.png".to_string())]);
        assert_eq!(plan.light.as_deref(), Some("BACKGROUND.png"));
        assert_eq!(plan.dark.as_deref(), Some("BACKGROUND.png"));
    }

    #[test]
    fn test_identical_paths_stage_one_file() {
        let bg = Path::new("art/bg.png");
        assert_eq!(
            BackgroundPlan::new(Some(bg), Some(bg)),
            BackgroundPlan::new(Some(bg), None)
        );
    }

    #[test]
    fn test_distinct_backgrounds_keep_extensions() {
        let plan = BackgroundPlan::new(Some(Path::new("light.png")), Some(Path::new("dark.tiff")));
        assert_eq!(plan.light.as_deref(), Some("BACKGROUND.png"));
        assert_eq!(plan.dark.as_deref(), Some("BACKGROUND-DARK.tiff"));
        assert_eq!(plan.copies.len(), 2);
    }

    #[test]
    fn test_dark_only_has_no_light_reference() {
        let plan = BackgroundPlan::new(None, Some(Path::new("dark.png")));
        assert_eq!(plan.light, None);
        assert_eq!(plan.dark.as_deref(), Some("BACKGROUND-DARK.png"));
    }

    #[tokio::test]
    async fn test_missing_image_fails_before_copying() {
        let dir = tempfile::tempdir().unwrap();
        let light = dir.path().join("light.png");
        std::fs::write(&light, b"png").unwrap();
        let plan = BackgroundPlan::new(Some(&light), Some(&dir.path().join("missing.png")));

        let resources = dir.path().join("resources");
        let err = stage_backgrounds(&plan, &resources).await.unwrap_err();
        assert!(matches!(err, Error::ImageNotFound(p) if p.ends_with("missing.png")));
        assert!(!resources.join("BACKGROUND.png").exists());
    }

    #[tokio::test]
    async fn test_prepare_resources_writes_only_provided_panels() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = DistributionMetadata {
            readme: Some("Read me".into()),
            ..Default::default()
        };
        let resources = dir.path().join("resources");
        let prepared = prepare_resources(&metadata, &resources).await.unwrap();

        assert_eq!(prepared.panels, vec![Panel::Readme]);
        assert!(resources.join("README.html").exists());
        assert!(!resources.join("WELCOME.html").exists());
        assert!(!resources.join("LICENSE.html").exists());
        assert!(prepared.backgrounds.is_empty());
    }
}
