use askama_actix::Template;

const PAGINATOR_LOOK_AHEAD: i32 = 2;

/// Page links for list views.
///
/// [1] 2 3 ... 13
/// 1 2 [3] 4 5 ... 13
/// 1 2 3 4 [5] 6 7 ... 13
/// 1 ... 4 5 [6] 7 8 ... 13
/// 1 ... 7 8 [9] 10 11 12 13
/// 1 ... 9 10 [11] 12 13
/// 1 ... 11 12 [13]
#[derive(Clone, Debug)]
pub struct Paginator {
    pub base_url: String,
    pub this_page: i32,
    pub page_count: i32,
}

/// One entry of the rendered page strip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLink {
    pub label: String,
    /// Empty for a gap.
    pub url: String,
    pub current: bool,
    pub gap: bool,
}

#[derive(Template)]
#[template(path = "util/paginator.html")]
struct PaginatorTemplate<'a> {
    links: &'a [PageLink],
}

impl Paginator {
    pub fn has_pages(&self) -> bool {
        self.page_count > 1
    }

    pub fn url_for(&self, page: i32) -> String {
        format!("{}?page={}", self.base_url, page)
    }

    /// Page numbers to show, `None` marking a collapsed gap.
    pub fn get_pages(&self) -> Vec<Option<i32>> {
        let mut pages = Vec::new();
        if !self.has_pages() {
            return pages;
        }

        let low = (self.this_page - PAGINATOR_LOOK_AHEAD).max(1);
        let high = (self.this_page + PAGINATOR_LOOK_AHEAD).min(self.page_count);

        if low > 1 {
            pages.push(Some(1));
        }
        // A gap of exactly one page is shown as that page.
        if low == 3 {
            pages.push(Some(2));
        } else if low > 3 {
            pages.push(None);
        }

        pages.extend((low..=high).map(Some));

        if high == self.page_count - 2 {
            pages.push(Some(self.page_count - 1));
        } else if high < self.page_count - 2 {
            pages.push(None);
        }
        if high < self.page_count {
            pages.push(Some(self.page_count));
        }

        pages
    }

    pub fn get_links(&self) -> Vec<PageLink> {
        self.get_pages()
            .into_iter()
            .map(|page| match page {
                Some(page) => PageLink {
                    label: page.to_string(),
                    url: self.url_for(page),
                    current: page == self.this_page,
                    gap: false,
                },
                None => PageLink {
                    label: "…".to_owned(),
                    url: String::new(),
                    current: false,
                    gap: true,
                },
            })
            .collect()
    }

    pub fn as_html(&self) -> String {
        if !self.has_pages() {
            return String::new();
        }

        let links = self.get_links();
        let template = PaginatorTemplate { links: &links };
        match template.render() {
            Ok(html) => html,
            Err(e) => {
                log::error!("Paginator::as_html: {}", e);
                "[Paginator Util Error]".to_owned()
            }
        }
    }
}

/// Resolves the raw `page` query value against the number of pages.
///
/// Returns the 1-based page, or `None` when the request should 404. `last` selects the
/// final page and an empty listing still has a first page.
pub fn resolve_page(raw: Option<&str>, page_count: usize) -> Option<usize> {
    let page_count = page_count.max(1);
    match raw.map(str::trim) {
        None | Some("") => Some(1),
        Some("last") => Some(page_count),
        Some(raw) => match raw.parse::<usize>() {
            Ok(page) if page >= 1 && page <= page_count => Some(page),
            _ => None,
        },
    }
}
