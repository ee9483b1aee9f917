use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};
use tracing::debug;
use url::Url;

use super::{EpisodeSource, SourceError, sanitize_title};
use crate::http::HttpClient;

static VIEWER_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.viewer_img").expect("valid selector"));
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid selector"));
static OG_TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector")
});

/// Naver Webtoon pages: `/webtoon/list` for metadata, `/webtoon/detail` per episode
pub struct NaverWebtoon {
    client: Arc<dyn HttpClient>,
    base_url: Url,
}

impl NaverWebtoon {
    pub fn new(client: Arc<dyn HttpClient>, base_url: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn episode_url(&self, comic_id: u64, episode: u32) -> Result<Url, SourceError> {
        let mut url = self.base_url.join("webtoon/detail")?;
        url.query_pairs_mut()
            .append_pair("titleId", &comic_id.to_string())
            .append_pair("no", &episode.to_string());
        Ok(url)
    }

    pub fn list_url(&self, comic_id: u64) -> Result<Url, SourceError> {
        let mut url = self.base_url.join("webtoon/list")?;
        url.query_pairs_mut()
            .append_pair("titleId", &comic_id.to_string());
        Ok(url)
    }
}

#[async_trait]
impl EpisodeSource for NaverWebtoon {
    async fn title(&self, comic_id: u64) -> Result<String, SourceError> {
        let url = self.list_url(comic_id)?;
        let html = self.client.get_text(url.as_str()).await?;

        extract_og_title(&html)
            .map(|raw| sanitize_title(&raw))
            .filter(|title| !title.is_empty())
            .ok_or(SourceError::NoTitle { comic_id })
    }

    async fn episode_images(
        &self,
        comic_id: u64,
        episode: u32,
    ) -> Result<Vec<String>, SourceError> {
        let url = self.episode_url(comic_id, episode)?;
        let html = self.client.get_text(url.as_str()).await?;

        let links = extract_image_links(&html, &url).ok_or(SourceError::NoViewer { episode })?;
        debug!(episode, count = links.len(), "Extracted image links");
        Ok(links)
    }
}

/// Image links inside the viewer, `data-src` before `src`, resolved against
/// the page. `None` when the page has no viewer at all.
pub(crate) fn extract_image_links(html: &str, page_url: &Url) -> Option<Vec<String>> {
    let document = Html::parse_document(html);
    let viewer = document.select(&VIEWER_SELECTOR).next()?;

    let links = viewer
        .select(&IMG_SELECTOR)
        .filter_map(|img| {
            let attrs = img.value();
            attrs.attr("data-src").or_else(|| attrs.attr("src"))
        })
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .filter_map(|link| page_url.join(link).ok())
        .map(String::from)
        .collect();

    Some(links)
}

pub(crate) fn extract_og_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&OG_TITLE_SELECTOR)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{FetchError, Result as FetchResult};
    use bytes::Bytes;
    use std::collections::HashMap;

    const EPISODE_PAGE: &str = r#"
        <html><body>
          <div class="header"><img src="/logo.png"></div>
          <div class="wt_viewer viewer_img">
            <img data-src="https://image-comic.pstatic.net/1.jpg" src="/blank.gif">
            <img src="https://image-comic.pstatic.net/2.jpg">
            <img src="">
            <img alt="no source">
            <img src="/relative/3.jpg">
          </div>
        </body></html>
    "#;

    struct PageClient {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl HttpClient for PageClient {
        async fn get_bytes(&self, _url: &str) -> FetchResult<Bytes> {
            Err(FetchError::Request("not used".to_string()))
        }

        async fn get_text(&self, url: &str) -> FetchResult<String> {
            self.pages.get(url).cloned().ok_or(FetchError::Status {
                code: 404,
                reason: "Not Found".to_string(),
            })
        }
    }

    fn source(pages: &[(&str, &str)]) -> NaverWebtoon {
        let client = PageClient {
            pages: pages
                .iter()
                .map(|(u, b)| (u.to_string(), b.to_string()))
                .collect(),
        };
        NaverWebtoon::new(Arc::new(client), "https://comic.naver.com").unwrap()
    }

    #[test]
    fn test_extract_prefers_data_src_and_resolves_relative() {
        let page = Url::parse("https://comic.naver.com/webtoon/detail?titleId=1&no=2").unwrap();
        let links = extract_image_links(EPISODE_PAGE, &page).unwrap();

        assert_eq!(
            links,
            vec![
                "https://image-comic.pstatic.net/1.jpg",
                "https://image-comic.pstatic.net/2.jpg",
                "https://comic.naver.com/relative/3.jpg",
            ]
        );
    }

    #[test]
    fn test_extract_without_viewer() {
        let page = Url::parse("https://comic.naver.com/").unwrap();
        assert!(extract_image_links("<html><img src='/a.jpg'></html>", &page).is_none());
    }

    #[test]
    fn test_extract_og_title() {
        let html = r#"<head><meta property="og:title" content="Lookism"></head>"#;
        assert_eq!(extract_og_title(html).as_deref(), Some("Lookism"));
        assert!(extract_og_title("<head></head>").is_none());
    }

    #[test]
    fn test_urls() {
        let src = source(&[]);
        assert_eq!(
            src.episode_url(183559, 12).unwrap().as_str(),
            "https://comic.naver.com/webtoon/detail?titleId=183559&no=12"
        );
        assert_eq!(
            src.list_url(183559).unwrap().as_str(),
            "https://comic.naver.com/webtoon/list?titleId=183559"
        );
    }

    #[tokio::test]
    async fn test_title_is_sanitized() {
        let src = source(&[(
            "https://comic.naver.com/webtoon/list?titleId=7",
            r#"<meta property="og:title" content="What? Why: Me/You">"#,
        )]);
        assert_eq!(src.title(7).await.unwrap(), "What- Why- Me-You");
    }

    #[tokio::test]
    async fn test_missing_title_is_an_error() {
        let src = source(&[("https://comic.naver.com/webtoon/list?titleId=7", "<html></html>")]);
        assert!(matches!(
            src.title(7).await,
            Err(SourceError::NoTitle { comic_id: 7 })
        ));
    }

    #[tokio::test]
    async fn test_episode_images_via_client() {
        let src = source(&[(
            "https://comic.naver.com/webtoon/detail?titleId=1&no=2",
            EPISODE_PAGE,
        )]);

        assert_eq!(src.episode_images(1, 2).await.unwrap().len(), 3);
        assert!(matches!(
            src.episode_images(1, 3).await,
            Err(SourceError::Fetch(FetchError::Status { code: 404, .. }))
        ));
    }
}
