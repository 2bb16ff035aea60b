use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Sentinel written for any field the page does not carry.
pub const NOT_FOUND: &str = "Not Found";

// Play Store stat strip: div.l8YSdd holds a row (div.w7Iutd) of stat cells
// (div.wVqUob), each with a value (div.ClM7O) and a label (div.g1rdde).
// Decorative cells (content-rating image, government badge) use the same
// shape, so cells are matched by label, never by position.
static STAT_CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.l8YSdd div.w7Iutd div.wVqUob").unwrap());
static VALUE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.ClM7O").unwrap());
static LABEL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.g1rdde").unwrap());
static RATING_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.TT9eCd").unwrap());
static UPDATED_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.xg1aie").unwrap());

// Quantity grammar: integer or decimal, optional K/M/B scale, optional
// trailing + ("at least"). Matched tokens are kept verbatim.
static QUANTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?(?:[KMB]\+?|\+)?").unwrap());
static DATE_MDY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z]{3}) (\d{1,2}), (\d{4})\b").unwrap());
static DATE_DMY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}) ([A-Za-z]{3}) (\d{4})\b").unwrap());

/// The four data points scraped from one app page. Each field is either the
/// extracted value or [`NOT_FOUND`]; fields degrade independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFields {
    pub rating: String,
    pub reviews: String,
    pub downloads: String,
    pub last_updated: String,
}

impl AppFields {
    fn none() -> Self {
        AppFields {
            rating: NOT_FOUND.to_string(),
            reviews: NOT_FOUND.to_string(),
            downloads: NOT_FOUND.to_string(),
            last_updated: NOT_FOUND.to_string(),
        }
    }
}

/// Extract rating, review count, download count and last-update date from a
/// raw storefront page. Pure; unparseable or empty input yields all
/// sentinels, it never errors out.
pub fn extract(raw_html: &str) -> AppFields {
    let doc = Html::parse_document(raw_html);
    let mut fields = AppFields::none();

    for cell in doc.select(&STAT_CELL_SEL) {
        // Rating lives in its own star node inside the cell value.
        if fields.rating == NOT_FOUND {
            if let Some(node) = cell.select(&RATING_SEL).next() {
                if let Some(v) = quantity_of(&text_of(node)) {
                    fields.rating = v;
                }
            }
        }

        let label = cell.select(&LABEL_SEL).next().map(|n| text_of(n));
        let Some(label) = label else { continue };
        let lower = label.to_lowercase();

        // The cell labelled "Downloads" holds the download count in its
        // value node; the review count sits inside its own label text
        // ("1.58K reviews"). Cells matching neither are decorative.
        if lower.contains("download") {
            if fields.downloads == NOT_FOUND {
                if let Some(v) = cell.select(&VALUE_SEL).next().and_then(|n| quantity_of(&text_of(n))) {
                    fields.downloads = v;
                }
            }
        } else if lower.contains("review") {
            if fields.reviews == NOT_FOUND {
                if let Some(v) = quantity_of(&label) {
                    fields.reviews = v;
                }
            }
        }
    }

    if let Some(node) = doc.select(&UPDATED_SEL).next() {
        if let Some(d) = normalize_date(&text_of(node)) {
            fields.last_updated = d;
        }
    }

    fields
}

fn text_of(node: ElementRef) -> String {
    node.text().collect::<String>().trim().to_string()
}

/// All quantity tokens in the text, verbatim, space-joined. None when the
/// text carries no token at all.
fn quantity_of(text: &str) -> Option<String> {
    let tokens: Vec<&str> = QUANTITY_RE.find_iter(text).map(|m| m.as_str()).collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Accept "Mon D, YYYY" or "D Mon YYYY" anywhere in the text and normalize
/// to "Mon DD, YYYY" (zero-padded day).
fn normalize_date(text: &str) -> Option<String> {
    let candidate = if let Some(c) = DATE_MDY_RE.captures(text) {
        NaiveDate::parse_from_str(&format!("{} {}, {}", &c[1], &c[2], &c[3]), "%b %d, %Y")
    } else if let Some(c) = DATE_DMY_RE.captures(text) {
        NaiveDate::parse_from_str(&format!("{} {} {}", &c[1], &c[2], &c[3]), "%d %b %Y")
    } else {
        return None;
    };
    candidate.ok().map(|d| d.format("%b %d, %Y").to_string())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn stat_page(rating: &str, reviews: &str, downloads: &str, updated: &str) -> String {
        format!(
            r#"<html><body>
            <div class="l8YSdd"><div class="w7Iutd">
              <div class="wVqUob">
                <div class="ClM7O">
                  <div itemprop="starRating">
                    <div class="TT9eCd" aria-label="Rated {rating} stars out of five stars">{rating}
                      <i class="google-material-icons" aria-hidden="true">star</i>
                    </div>
                  </div>
                </div>
                <div class="g1rdde">{reviews} reviews
                  <span aria-label="Ratings and reviews are verified" role="button">
                    <i class="google-material-icons" aria-hidden="true">info</i>
                  </span>
                </div>
              </div>
              <div class="wVqUob">
                <div class="ClM7O">{downloads}</div>
                <div class="g1rdde">Downloads</div>
              </div>
              <div class="wVqUob">
                <div class="ClM7O"><img alt="Content rating" itemprop="image"></div>
                <div class="g1rdde"><span itemprop="contentRating"><span>PEGI 3</span></span></div>
              </div>
            </div></div>
            <div class="xg1aie">Last Updated: {updated}</div>
            </body></html>"#
        )
    }

    #[test]
    fn full_page_extracts_all_fields() {
        let f = extract(&stat_page("4.3", "1.58K", "100M+", "Jan 1, 2025"));
        assert_eq!(f.rating, "4.3");
        assert_eq!(f.reviews, "1.58K");
        assert_eq!(f.downloads, "100M+");
        assert_eq!(f.last_updated, "Jan 01, 2025");
    }

    #[test]
    fn quantity_tokens_survive_verbatim() {
        for token in ["100", "100+", "1.58K", "1.58K+", "100M", "1.58B+", "3"] {
            let f = extract(&stat_page("3", token, token, "Jan 1, 2025"));
            assert_eq!(f.reviews, token, "review token {token}");
            assert_eq!(f.downloads, token, "download token {token}");
        }
    }

    #[test]
    fn both_date_forms_normalize_identically() {
        let a = extract(&stat_page("3", "10", "10", "Jan 1, 2025"));
        let b = extract(&stat_page("3", "10", "10", "1 Jan 2025"));
        assert_eq!(a.last_updated, "Jan 01, 2025");
        assert_eq!(b.last_updated, "Jan 01, 2025");
        let c = extract(&stat_page("3", "10", "10", "30 Mar 2020"));
        assert_eq!(c.last_updated, "Mar 30, 2020");
    }

    #[test]
    fn badge_cell_between_stats_is_ignored() {
        // Government badge cell interleaved before the Downloads cell,
        // same node shape as a data cell.
        let html = r#"<html><body>
            <div class="l8YSdd"><div class="w7Iutd">
              <div class="wVqUob">
                <div class="ClM7O"><div class="TT9eCd">4.1<i>star</i></div></div>
                <div class="g1rdde">523 reviews</div>
              </div>
              <div class="wVqUob">
                <div class="ClM7O"><span><svg></svg></span></div>
                <div class="g1rdde"><span aria-label="Government App"><span>Government</span></span></div>
              </div>
              <div class="wVqUob">
                <div class="ClM7O">10K+</div>
                <div class="g1rdde">Downloads</div>
              </div>
            </div></div>
            </body></html>"#;
        let f = extract(html);
        assert_eq!(f.rating, "4.1");
        assert_eq!(f.reviews, "523");
        assert_eq!(f.downloads, "10K+");
    }

    #[test]
    fn missing_rating_block_leaves_counts_intact() {
        let html = r#"<html><body>
            <div class="l8YSdd"><div class="w7Iutd">
              <div class="wVqUob">
                <div class="ClM7O">500+</div>
                <div class="g1rdde">Downloads</div>
              </div>
            </div></div>
            <div class="xg1aie">Updated on Mar 20, 2010</div>
            </body></html>"#;
        let f = extract(html);
        assert_eq!(f.rating, NOT_FOUND);
        assert_eq!(f.reviews, NOT_FOUND);
        assert_eq!(f.downloads, "500+");
        assert_eq!(f.last_updated, "Mar 20, 2010");
    }

    #[test]
    fn date_only_page_degrades_field_by_field() {
        let f = extract(r#"<html><body><div class="xg1aie">5 Feb 2024</div></body></html>"#);
        assert_eq!(f.rating, NOT_FOUND);
        assert_eq!(f.reviews, NOT_FOUND);
        assert_eq!(f.downloads, NOT_FOUND);
        assert_eq!(f.last_updated, "Feb 05, 2024");
    }

    #[test]
    fn garbage_and_empty_input_never_panic() {
        for input in ["", "not html at all", "<<<><div", "<html><body></body></html>"] {
            let f = extract(input);
            assert_eq!(f.rating, NOT_FOUND);
            assert_eq!(f.reviews, NOT_FOUND);
            assert_eq!(f.downloads, NOT_FOUND);
            assert_eq!(f.last_updated, NOT_FOUND);
        }
    }

    #[test]
    fn unparseable_date_text_is_not_found() {
        let f = extract(r#"<html><body><div class="xg1aie">recently</div></body></html>"#);
        assert_eq!(f.last_updated, NOT_FOUND);
    }
}
