use serde::Serialize;

use crate::models::{ArticleRef, ExportFormat};
use crate::session::SessionId;
use crate::utils::csv;

const CSV_HEADER: [&str; 9] = [
    "id", "title", "date", "source", "url", "snippet", "pinned", "pin_order", "last_seen",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub content_type: &'static str,
    pub filename: String,
    pub body: String,
}

#[derive(Serialize)]
struct JsonExport<'a> {
    ok: bool,
    sid: &'a str,
    items: &'a [ArticleRef],
}

pub fn render(
    session: &SessionId,
    items: &[ArticleRef],
    format: ExportFormat,
) -> Result<ExportPayload, serde_json::Error> {
    let stamp = chrono::Utc::now().format("%Y%m%d");

    match format {
        ExportFormat::Json => Ok(ExportPayload {
            content_type: "application/json",
            filename: format!("trove-context-{}.json", stamp),
            body: to_json(session, items)?,
        }),
        ExportFormat::Csv => Ok(ExportPayload {
            content_type: "text/csv; charset=utf-8",
            filename: format!("trove-context-{}.csv", stamp),
            body: to_csv(items),
        }),
    }
}

pub fn to_json(session: &SessionId, items: &[ArticleRef]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonExport {
        ok: true,
        sid: session.as_str(),
        items,
    })
}

pub fn to_csv(items: &[ArticleRef]) -> String {
    let mut out = String::new();
    csv::write_record(&mut out, CSV_HEADER);

    for item in items {
        let pinned = if item.pinned { "true" } else { "false" };
        let pin_order = item.pin_order.to_string();
        let last_seen = item.last_seen.to_string();
        csv::write_record(
            &mut out,
            [
                item.id.as_str(),
                item.title.as_str(),
                item.date.as_str(),
                item.source.as_str(),
                item.url.as_str(),
                item.snippet.as_str(),
                pinned,
                pin_order.as_str(),
                last_seen.as_str(),
            ],
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, snippet: &str, pinned: bool) -> ArticleRef {
        ArticleRef {
            id: id.to_string(),
            title: format!("Title {}", id),
            date: "1923-04-05".to_string(),
            source: "The Argus (Melbourne, Vic.)".to_string(),
            url: format!("https://trove.nla.gov.au/newspaper/article/{}", id),
            snippet: snippet.to_string(),
            pinned,
            last_seen: 1_700_000_000_000,
            pin_order: if pinned { 1 } else { 0 },
        }
    }

    #[test]
    fn test_csv_snippet_with_comma_and_newline_round_trips() {
        let snippet = "Wheat, wool and\nwine exports, up again";
        let body = to_csv(&[article("1", snippet, true), article("2", "plain", false)]);

        let records = csv::parse(&body);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], CSV_HEADER.map(String::from).to_vec());
        assert_eq!(records[1][5], snippet);
        assert_eq!(records[1][3], "The Argus (Melbourne, Vic.)");
        assert_eq!(records[1][6], "true");
        assert_eq!(records[2][0], "2");
    }

    #[test]
    fn test_json_export_shape() {
        let sid = SessionId::parse("s1").unwrap();
        let body = to_json(&sid, &[article("7", "x", false)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(value["ok"], true);
        assert_eq!(value["sid"], "s1");
        assert_eq!(value["items"][0]["id"], "7");
    }

    #[test]
    fn test_render_picks_content_type() {
        let sid = SessionId::parse("s1").unwrap();
        let csv = render(&sid, &[], ExportFormat::Csv).unwrap();
        assert!(csv.content_type.starts_with("text/csv"));
        assert!(csv.filename.ends_with(".csv"));

        let json = render(&sid, &[], ExportFormat::Json).unwrap();
        assert_eq!(json.content_type, "application/json");
    }
}
