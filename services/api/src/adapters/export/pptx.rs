//! PresentationML rendering of a [`SlideDeck`].
//!
//! The package carries one slide master with two layouts: a title slide
//! (layout 1) and a title-and-content slide (layout 2). Slide size is the
//! classic 4:3, 10 x 7.5 inches.

use super::package::{
    content_types_xml, core_properties_xml, escape_xml, relationships_xml, write_package, Part,
    REL_CORE_PROPERTIES, REL_OFFICE_DOCUMENT, XML_DECLARATION,
};
use super::{Slide, SlideDeck, BODY_FONT};
use docgen_core::ports::PortResult;

const NAMESPACES: &str = "xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
     xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
     xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\"";

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CT_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_LAYOUT: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

const SLIDE_WIDTH: u32 = 9_144_000;
const SLIDE_HEIGHT: u32 = 6_858_000;

/// Placeholder frames as (x, y, cx, cy) in EMU.
const CENTER_TITLE_FRAME: (u32, u32, u32, u32) = (685_800, 2_130_425, 7_772_400, 1_470_025);
const SUBTITLE_FRAME: (u32, u32, u32, u32) = (1_371_600, 3_886_200, 6_400_800, 1_752_600);
const TITLE_FRAME: (u32, u32, u32, u32) = (457_200, 274_638, 8_229_600, 1_143_000);
const BODY_FRAME: (u32, u32, u32, u32) = (457_200, 1_600_200, 8_229_600, 4_525_963);

const TITLE_LAYOUT: usize = 1;
const CONTENT_LAYOUT: usize = 2;

pub(super) fn render(deck: &SlideDeck) -> PortResult<Vec<u8>> {
    let mut overrides = vec![
        ("/ppt/presentation.xml".to_string(), CT_PRESENTATION),
        ("/ppt/slideMasters/slideMaster1.xml".to_string(), CT_MASTER),
        ("/ppt/slideLayouts/slideLayout1.xml".to_string(), CT_LAYOUT),
        ("/ppt/slideLayouts/slideLayout2.xml".to_string(), CT_LAYOUT),
        ("/ppt/theme/theme1.xml".to_string(), CT_THEME),
    ];
    for n in 1..=deck.slides.len() {
        overrides.push((format!("/ppt/slides/slide{}.xml", n), CT_SLIDE));
    }

    let mut parts = vec![
        Part::new("[Content_Types].xml", content_types_xml(&overrides)),
        Part::new(
            "_rels/.rels",
            relationships_xml(&[
                ("rId1", REL_OFFICE_DOCUMENT, "ppt/presentation.xml"),
                ("rId2", REL_CORE_PROPERTIES, "docProps/core.xml"),
            ]),
        ),
        Part::new("docProps/core.xml", core_properties_xml(&deck.title)),
        Part::new("ppt/presentation.xml", presentation_xml(deck.slides.len())),
        Part::new(
            "ppt/_rels/presentation.xml.rels",
            presentation_rels_xml(deck.slides.len()),
        ),
        Part::new("ppt/slideMasters/slideMaster1.xml", master_xml()),
        Part::new(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            relationships_xml(&[
                ("rId1", &rel("slideLayout"), "../slideLayouts/slideLayout1.xml"),
                ("rId2", &rel("slideLayout"), "../slideLayouts/slideLayout2.xml"),
                ("rId3", &rel("theme"), "../theme/theme1.xml"),
            ]),
        ),
        Part::new("ppt/slideLayouts/slideLayout1.xml", title_layout_xml()),
        Part::new("ppt/slideLayouts/slideLayout2.xml", content_layout_xml()),
        Part::new("ppt/theme/theme1.xml", theme_xml()),
    ];
    for n in 1..=2 {
        parts.push(Part::new(
            format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", n),
            relationships_xml(&[(
                "rId1",
                &rel("slideMaster"),
                "../slideMasters/slideMaster1.xml",
            )]),
        ));
    }

    for (i, slide) in deck.slides.iter().enumerate() {
        let n = i + 1;
        let (xml, layout) = match slide {
            Slide::Title { title, subtitle } => (title_slide_xml(title, subtitle), TITLE_LAYOUT),
            Slide::Content {
                title,
                body,
                font_size_pt,
            } => (content_slide_xml(title, body, *font_size_pt), CONTENT_LAYOUT),
        };
        parts.push(Part::new(format!("ppt/slides/slide{}.xml", n), xml));
        parts.push(Part::new(
            format!("ppt/slides/_rels/slide{}.xml.rels", n),
            relationships_xml(&[(
                "rId1",
                &rel("slideLayout"),
                &format!("../slideLayouts/slideLayout{}.xml", layout),
            )]),
        ));
    }

    write_package(&parts)
}

fn rel(kind: &str) -> String {
    format!("{}/{}", REL_BASE, kind)
}

fn presentation_xml(slide_count: usize) -> String {
    // rId1 is the master, rId2 the theme, slides start at rId3.
    let slide_ids: String = (0..slide_count)
        .map(|i| format!("<p:sldId id=\"{}\" r:id=\"rId{}\"/>", 256 + i, i + 3))
        .collect();
    let slide_list = if slide_ids.is_empty() {
        String::new()
    } else {
        format!("<p:sldIdLst>{}</p:sldIdLst>", slide_ids)
    };

    format!(
        "{}<p:presentation {}>\
         <p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
         {}<p:sldSz cx=\"{}\" cy=\"{}\" type=\"screen4x3\"/><p:notesSz cx=\"{}\" cy=\"{}\"/>\
         </p:presentation>",
        XML_DECLARATION, NAMESPACES, slide_list, SLIDE_WIDTH, SLIDE_HEIGHT, SLIDE_HEIGHT, SLIDE_WIDTH
    )
}

fn presentation_rels_xml(slide_count: usize) -> String {
    let master = rel("slideMaster");
    let theme = rel("theme");
    let slide = rel("slide");
    let ids: Vec<String> = (0..slide_count).map(|i| format!("rId{}", i + 3)).collect();
    let targets: Vec<String> = (0..slide_count)
        .map(|i| format!("slides/slide{}.xml", i + 1))
        .collect();

    let mut relationships = vec![
        ("rId1", master.as_str(), "slideMasters/slideMaster1.xml"),
        ("rId2", theme.as_str(), "theme/theme1.xml"),
    ];
    for (id, target) in ids.iter().zip(&targets) {
        relationships.push((id.as_str(), slide.as_str(), target.as_str()));
    }
    relationships_xml(&relationships)
}

fn group_shape_header() -> &'static str {
    "<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
     <p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/>\
     <a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>"
}

/// A placeholder shape. `frame` is only set on layouts; slides inherit it.
fn placeholder(
    id: u32,
    name: &str,
    placeholder: &str,
    frame: Option<(u32, u32, u32, u32)>,
    paragraphs: &str,
) -> String {
    let shape_properties = match frame {
        Some((x, y, cx, cy)) => format!(
            "<p:spPr><a:xfrm><a:off x=\"{}\" y=\"{}\"/><a:ext cx=\"{}\" cy=\"{}\"/></a:xfrm></p:spPr>",
            x, y, cx, cy
        ),
        None => "<p:spPr/>".to_string(),
    };
    format!(
        "<p:sp><p:nvSpPr><p:cNvPr id=\"{}\" name=\"{}\"/>\
         <p:cNvSpPr><a:spLocks noGrp=\"1\"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr>\
         {}<p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp>",
        id, name, placeholder, shape_properties, paragraphs
    )
}

fn text_paragraph(text: &str, font_size_pt: Option<u32>) -> String {
    let run_properties = match font_size_pt {
        Some(size) => format!(
            "<a:rPr lang=\"en-US\" sz=\"{}\" dirty=\"0\"><a:latin typeface=\"{}\"/></a:rPr>",
            size * 100,
            BODY_FONT
        ),
        None => "<a:rPr lang=\"en-US\" dirty=\"0\"/>".to_string(),
    };
    if text.is_empty() {
        let end = run_properties
            .replacen("<a:rPr", "<a:endParaRPr", 1)
            .replace("</a:rPr>", "</a:endParaRPr>");
        return format!("<a:p>{}</a:p>", end);
    }
    format!(
        "<a:p><a:r>{}<a:t>{}</a:t></a:r></a:p>",
        run_properties,
        escape_xml(text)
    )
}

fn empty_paragraph() -> &'static str {
    "<a:p><a:endParaRPr lang=\"en-US\"/></a:p>"
}

fn slide_xml(root: &str, attributes: &str, name: Option<&str>, shapes: &str) -> String {
    let name = name
        .map(|n| format!(" name=\"{}\"", n))
        .unwrap_or_default();
    format!(
        "{}<p:{root} {}{}><p:cSld{}><p:spTree>{}{}</p:spTree></p:cSld>\
         <p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:{root}>",
        XML_DECLARATION,
        NAMESPACES,
        attributes,
        name,
        group_shape_header(),
        shapes,
        root = root,
    )
}

fn title_slide_xml(title: &str, subtitle: &str) -> String {
    let shapes = format!(
        "{}{}",
        placeholder(2, "Title 1", "<p:ph type=\"ctrTitle\"/>", None, &text_paragraph(title, None)),
        placeholder(
            3,
            "Subtitle 2",
            "<p:ph type=\"subTitle\" idx=\"1\"/>",
            None,
            &text_paragraph(subtitle, None)
        ),
    );
    slide_xml("sld", "", None, &shapes)
}

/// Each line of `body` becomes its own paragraph at `font_size_pt`.
fn content_slide_xml(title: &str, body: &str, font_size_pt: u32) -> String {
    let paragraphs: String = body
        .split('\n')
        .map(|line| text_paragraph(line.trim_end_matches('\r'), Some(font_size_pt)))
        .collect();
    let shapes = format!(
        "{}{}",
        placeholder(2, "Title 1", "<p:ph type=\"title\"/>", None, &text_paragraph(title, None)),
        placeholder(3, "Content Placeholder 2", "<p:ph idx=\"1\"/>", None, &paragraphs),
    );
    slide_xml("sld", "", None, &shapes)
}

fn title_layout_xml() -> String {
    let shapes = format!(
        "{}{}",
        placeholder(
            2,
            "Title 1",
            "<p:ph type=\"ctrTitle\"/>",
            Some(CENTER_TITLE_FRAME),
            empty_paragraph()
        ),
        placeholder(
            3,
            "Subtitle 2",
            "<p:ph type=\"subTitle\" idx=\"1\"/>",
            Some(SUBTITLE_FRAME),
            empty_paragraph()
        ),
    );
    slide_xml(
        "sldLayout",
        " type=\"title\" preserve=\"1\"",
        Some("Title Slide"),
        &shapes,
    )
}

fn content_layout_xml() -> String {
    let shapes = format!(
        "{}{}",
        placeholder(
            2,
            "Title 1",
            "<p:ph type=\"title\"/>",
            Some(TITLE_FRAME),
            empty_paragraph()
        ),
        placeholder(
            3,
            "Content Placeholder 2",
            "<p:ph idx=\"1\"/>",
            Some(BODY_FRAME),
            empty_paragraph()
        ),
    );
    slide_xml(
        "sldLayout",
        " type=\"obj\" preserve=\"1\"",
        Some("Title and Content"),
        &shapes,
    )
}

fn master_xml() -> String {
    let shapes = format!(
        "{}{}",
        placeholder(
            2,
            "Title Placeholder 1",
            "<p:ph type=\"title\"/>",
            Some(TITLE_FRAME),
            empty_paragraph()
        ),
        placeholder(
            3,
            "Text Placeholder 2",
            "<p:ph type=\"body\" idx=\"1\"/>",
            Some(BODY_FRAME),
            empty_paragraph()
        ),
    );
    format!(
        "{}<p:sldMaster {}><p:cSld><p:bg><p:bgRef idx=\"1001\"><a:schemeClr val=\"bg1\"/></p:bgRef></p:bg>\
         <p:spTree>{}{}</p:spTree></p:cSld>\
         <p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" \
         accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" \
         hlink=\"hlink\" folHlink=\"folHlink\"/>\
         <p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/>\
         <p:sldLayoutId id=\"2147483650\" r:id=\"rId2\"/></p:sldLayoutIdLst>\
         </p:sldMaster>",
        XML_DECLARATION,
        NAMESPACES,
        group_shape_header(),
        shapes
    )
}

fn theme_xml() -> String {
    let solid = "<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>";
    let fills = solid.repeat(3);
    let lines: String = [9525, 25400, 38100]
        .iter()
        .map(|w| format!("<a:ln w=\"{}\">{}</a:ln>", w, solid))
        .collect();
    let effects = "<a:effectStyle><a:effectLst/></a:effectStyle>".repeat(3);

    format!(
        "{decl}<a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"Office Theme\">\
         <a:themeElements>\
         <a:clrScheme name=\"Office\">\
         <a:dk1><a:sysClr val=\"windowText\" lastClr=\"000000\"/></a:dk1>\
         <a:lt1><a:sysClr val=\"window\" lastClr=\"FFFFFF\"/></a:lt1>\
         <a:dk2><a:srgbClr val=\"1F497D\"/></a:dk2><a:lt2><a:srgbClr val=\"EEECE1\"/></a:lt2>\
         <a:accent1><a:srgbClr val=\"4F81BD\"/></a:accent1><a:accent2><a:srgbClr val=\"C0504D\"/></a:accent2>\
         <a:accent3><a:srgbClr val=\"9BBB59\"/></a:accent3><a:accent4><a:srgbClr val=\"8064A2\"/></a:accent4>\
         <a:accent5><a:srgbClr val=\"4BACC6\"/></a:accent5><a:accent6><a:srgbClr val=\"F79646\"/></a:accent6>\
         <a:hlink><a:srgbClr val=\"0000FF\"/></a:hlink><a:folHlink><a:srgbClr val=\"800080\"/></a:folHlink>\
         </a:clrScheme>\
         <a:fontScheme name=\"Office\">\
         <a:majorFont><a:latin typeface=\"{font}\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:majorFont>\
         <a:minorFont><a:latin typeface=\"{font}\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:minorFont>\
         </a:fontScheme>\
         <a:fmtScheme name=\"Office\">\
         <a:fillStyleLst>{fills}</a:fillStyleLst>\
         <a:lnStyleLst>{lines}</a:lnStyleLst>\
         <a:effectStyleLst>{effects}</a:effectStyleLst>\
         <a:bgFillStyleLst>{fills}</a:bgFillStyleLst>\
         </a:fmtScheme></a:themeElements>\
         <a:objectDefaults/><a:extraClrSchemeLst/></a:theme>",
        decl = XML_DECLARATION,
        font = BODY_FONT,
        fills = fills,
        lines = lines,
        effects = effects,
    )
}
