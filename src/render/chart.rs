//! Clustered column chart parts shared by the slide and workbook renderers.

use super::package::xml_text;
use crate::schema::cells::{CellRange, CellRef};
use crate::schema::office::ChartSeries;

pub const CHART_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";
pub const CHART_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";

const CAT_AX_ID: u32 = 500_000_001;
const VAL_AX_ID: u32 = 500_000_002;

/// Chart with its data written inline, for decks without an embedded workbook.
pub fn literal_bar_chart(categories: &[String], series: &[ChartSeries]) -> String {
    let mut body = String::new();
    for (index, entry) in series.iter().enumerate() {
        body.push_str(&format!(
            r#"<c:ser><c:idx val="{index}"/><c:order val="{index}"/><c:tx><c:v>{}</c:v></c:tx><c:invertIfNegative val="0"/>"#,
            xml_text(&entry.name)
        ));
        if !categories.is_empty() {
            body.push_str(&format!(
                r#"<c:cat><c:strLit><c:ptCount val="{}"/>"#,
                categories.len()
            ));
            for (idx, category) in categories.iter().enumerate() {
                body.push_str(&format!(
                    r#"<c:pt idx="{idx}"><c:v>{}</c:v></c:pt>"#,
                    xml_text(category)
                ));
            }
            body.push_str("</c:strLit></c:cat>");
        }
        body.push_str(&format!(
            r#"<c:val><c:numLit><c:formatCode>General</c:formatCode><c:ptCount val="{}"/>"#,
            entry.values.len()
        ));
        for (idx, value) in entry.values.iter().enumerate() {
            body.push_str(&format!(r#"<c:pt idx="{idx}"><c:v>{value}</c:v></c:pt>"#));
        }
        body.push_str("</c:numLit></c:val></c:ser>");
    }
    chart_space(&body)
}

/// One series per column of `range`; the first row holds the series titles.
pub fn range_bar_chart(sheet_name: &str, range: CellRange) -> String {
    let sheet = quote_sheet_name(sheet_name);
    let first_value_row = if range.end.row > range.start.row {
        range.start.row + 1
    } else {
        range.start.row
    };
    let mut body = String::new();
    for (index, col) in (range.start.col..=range.end.col).enumerate() {
        let title = CellRef {
            row: range.start.row,
            col,
        };
        let values = CellRange {
            start: CellRef {
                row: first_value_row,
                col,
            },
            end: CellRef {
                row: range.end.row,
                col,
            },
        };
        body.push_str(&format!(
            r#"<c:ser><c:idx val="{index}"/><c:order val="{index}"/><c:tx><c:strRef><c:f>{}</c:f></c:strRef></c:tx><c:invertIfNegative val="0"/><c:val><c:numRef><c:f>{}</c:f></c:numRef></c:val></c:ser>"#,
            xml_text(&format!("{sheet}!{}", title.absolute())),
            xml_text(&format!(
                "{sheet}!{}:{}",
                values.start.absolute(),
                values.end.absolute()
            )),
        ));
    }
    chart_space(&body)
}

pub fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

fn chart_space(series: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="{CHART_NS}" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><c:roundedCorners val="0"/><c:chart><c:autoTitleDeleted val="0"/><c:plotArea><c:layout/><c:barChart><c:barDir val="col"/><c:grouping val="clustered"/><c:varyColors val="0"/>{series}<c:gapWidth val="150"/><c:axId val="{CAT_AX_ID}"/><c:axId val="{VAL_AX_ID}"/></c:barChart><c:catAx><c:axId val="{CAT_AX_ID}"/><c:scaling><c:orientation val="minMax"/></c:scaling><c:delete val="0"/><c:axPos val="b"/><c:numFmt formatCode="General" sourceLinked="1"/><c:tickLblPos val="nextTo"/><c:crossAx val="{VAL_AX_ID}"/><c:crosses val="autoZero"/><c:auto val="1"/><c:lblAlgn val="ctr"/><c:lblOffset val="100"/><c:noMultiLvlLbl val="0"/></c:catAx><c:valAx><c:axId val="{VAL_AX_ID}"/><c:scaling><c:orientation val="minMax"/></c:scaling><c:delete val="0"/><c:axPos val="l"/><c:majorGridlines/><c:numFmt formatCode="General" sourceLinked="1"/><c:tickLblPos val="nextTo"/><c:crossAx val="{CAT_AX_ID}"/><c:crosses val="autoZero"/><c:crossBetween val="between"/></c:valAx></c:plotArea><c:legend><c:legendPos val="r"/><c:overlay val="0"/></c:legend><c:plotVisOnly val="1"/><c:dispBlanksAs val="gap"/></c:chart></c:chartSpace>"#
    )
}
