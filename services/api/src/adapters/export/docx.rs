//! WordprocessingML rendering of a [`WordDocument`] through `docx-rs`.

use super::package::strip_control_characters;
use super::{Block, WordDocument, BODY_FONT, DOCUMENT_FONT_SIZE_PT};
use docgen_core::ports::{PortError, PortResult};
use docx_rs::{AlignmentType, Docx, Paragraph, Run, RunFonts, Style, StyleType};
use std::io::Cursor;

/// Heading sizes in half-points, by level.
const HEADING_SIZES: [usize; 3] = [32, 26, 24];
const TITLE_SIZE: usize = 56;
const HEADING_COLOR: &str = "2F5496";

pub(super) fn render(document: &WordDocument) -> PortResult<Vec<u8>> {
    let mut docx = styled_document();
    for block in &document.blocks {
        docx = docx.add_paragraph(paragraph(block));
    }

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| PortError::Unexpected(format!("Failed to write document: {}", e)))?;
    Ok(buffer.into_inner())
}

fn heading_style_id(level: u8) -> String {
    let level = level.clamp(1, HEADING_SIZES.len() as u8);
    format!("Heading{}", level)
}

fn paragraph(block: &Block) -> Paragraph {
    let (text, style) = match block {
        Block::Title(text) => (text, Some("Title".to_string())),
        Block::Heading { level, text } => (text, Some(heading_style_id(*level))),
        Block::Paragraph(text) => (text, None),
    };

    let mut paragraph =
        Paragraph::new().add_run(Run::new().add_text(strip_control_characters(text)));
    if let Some(style) = style {
        paragraph = paragraph.style(&style);
    }
    if matches!(block, Block::Title(_)) {
        paragraph = paragraph.align(AlignmentType::Center);
    }
    paragraph
}

/// Calibri 11pt defaults plus the Title and Heading1-3 paragraph styles.
fn styled_document() -> Docx {
    let fonts = RunFonts::new()
        .ascii(BODY_FONT)
        .hi_ansi(BODY_FONT)
        .east_asia(BODY_FONT)
        .cs(BODY_FONT);

    let mut docx = Docx::new()
        .default_fonts(fonts)
        .default_size(DOCUMENT_FONT_SIZE_PT as usize * 2)
        .add_style(
            Style::new("Title", StyleType::Paragraph)
                .name("Title")
                .based_on("Normal")
                .size(TITLE_SIZE),
        );

    for (i, size) in HEADING_SIZES.iter().enumerate() {
        let level = i + 1;
        docx = docx.add_style(
            Style::new(format!("Heading{}", level), StyleType::Paragraph)
                .name(format!("heading {}", level))
                .based_on("Normal")
                .size(*size)
                .bold()
                .color(HEADING_COLOR),
        );
    }
    docx
}
