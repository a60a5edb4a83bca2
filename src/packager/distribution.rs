//! Distribution descriptor mutation.
//!
//! `productbuild --synthesize` writes a minimal `installer-gui-script`
//! document. Installer UI settings are appended as direct children of its root
//! element before the product archive is built.

use super::error::{Result, ErrorExt};
use super::resources::{Panel, PreparedResources};
use crate::bail;
use std::io::{Cursor, Write};
use std::path::Path;
use xml::reader::{ParserConfig, XmlEvent as ReaderEvent};
use xml::writer::{EmitterConfig, EventWriter, XmlEvent};

/// One element appended to the descriptor root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DistributionElement {
    /// `<title>` with text content
    Title(String),
    /// `<background>` for the light appearance
    Background {
        /// File name inside the resources directory
        file: String,
    },
    /// `<background-darkAqua>` for the dark appearance
    BackgroundDarkAqua {
        /// File name inside the resources directory
        file: String,
    },
    /// `<welcome>`, `<readme>` or `<license>`
    Panel(Panel),
}

impl DistributionElement {
    /// Element name in the descriptor.
    pub fn name(&self) -> &'static str {
        match self {
            DistributionElement::Title(_) => "title",
            DistributionElement::Background { .. } => "background",
            DistributionElement::BackgroundDarkAqua { .. } => "background-darkAqua",
            DistributionElement::Panel(panel) => panel.element_name(),
        }
    }

    fn write<W: Write>(&self, writer: &mut EventWriter<W>) -> Result<()> {
        match self {
            DistributionElement::Title(title) => {
                writer.write(XmlEvent::start_element(self.name()))?;
                writer.write(XmlEvent::characters(title))?;
            }
            DistributionElement::Background { file }
            | DistributionElement::BackgroundDarkAqua { file } => {
                writer.write(
                    XmlEvent::start_element(self.name())
                        .attr("file", file)
                        .attr("alignment", "bottomleft")
                        .attr("scaling", "tofit"),
                )?;
            }
            DistributionElement::Panel(panel) => {
                writer.write(
                    XmlEvent::start_element(self.name())
                        .attr("file", panel.file_name())
                        .attr("mimetype", "text/html"),
                )?;
            }
        }
        writer.write(XmlEvent::end_element())?;
        Ok(())
    }
}

/// Ordered set of elements to append.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistributionElements {
    elements: Vec<DistributionElement>,
}

impl DistributionElements {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an element.
    pub fn push(&mut self, element: DistributionElement) {
        self.elements.push(element);
    }

    /// Builds the elements for a title and a set of staged resources.
    ///
    /// Order: title, backgrounds (light then dark), panels.
    pub fn from_resources(title: Option<&str>, resources: &PreparedResources) -> Self {
        let mut elements = Self::new();
        if let Some(title) = title {
            elements.push(DistributionElement::Title(title.to_string()));
        }
        if let Some(file) = &resources.backgrounds.light {
            elements.push(DistributionElement::Background { file: file.clone() });
        }
        if let Some(file) = &resources.backgrounds.dark {
            elements.push(DistributionElement::BackgroundDarkAqua { file: file.clone() });
        }
        for panel in &resources.panels {
            elements.push(DistributionElement::Panel(*panel));
        }
        elements
    }

    /// True when there is nothing to append.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in append order.
    pub fn iter(&self) -> impl Iterator<Item = &DistributionElement> {
        self.elements.iter()
    }
}

/// Appends `elements` to the root of an in-memory descriptor.
///
/// Every other event is copied through unchanged; the output is re-indented.
pub fn append_to_root(xml: &[u8], elements: &DistributionElements) -> Result<Vec<u8>> {
    let mut reader = ParserConfig::new()
        .trim_whitespace(true)
        .create_reader(Cursor::new(xml));
    let mut writer = EmitterConfig::new()
        .perform_indent(true)
        .create_writer(Vec::with_capacity(xml.len() * 2));

    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        let event = reader.next()?;
        match &event {
            ReaderEvent::EndDocument => break,
            ReaderEvent::StartElement { .. } => {
                depth += 1;
                saw_root = true;
            }
            ReaderEvent::EndElement { .. } => {
                if depth == 1 {
                    for element in elements.iter() {
                        element.write(&mut writer)?;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            _ => {}
        }

        if let Some(event) = event.as_writer_event() {
            writer.write(event)?;
        }
    }

    if !saw_root {
        bail!("distribution descriptor has no root element");
    }

    let mut output = writer.into_inner();
    output.push(b'\n');
    Ok(output)
}

/// Appends `elements` to the descriptor at `path`, rewriting it in place.
pub async fn inject_elements(path: &Path, elements: &DistributionElements) -> Result<()> {
    let xml = tokio::fs::read(path)
        .await
        .fs_context("reading distribution descriptor", path)?;
    let updated = append_to_root(&xml, elements)?;
    tokio::fs::write(path, updated)
        .await
        .fs_context("writing distribution descriptor", path)?;
    log::info!("✓ Updated distribution descriptor");
    Ok(())
}
