//! Source Registry
//!
//! Declarative catalog of news sources: base URLs, RSS feeds, extractor
//! dispatch tags, and URL accept/reject patterns shared by the Listing
//! Discoverer and Article Extractor.

use serde::{Deserialize, Serialize};

/// Per-source dispatch tag for the Article Extractor (spec §9 REDESIGN FLAGS:
/// a tagged sum, not inheritance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extractor {
    Generic,
    JsonLd,
    CnnTurk,
    Sabah,
    T24,
    Ntv,
    Nefes,
    HaberSol,
    GazeteDuvar,
    Evrensel,
    Sendika,
}

/// How the Listing Discoverer finds candidate article URLs for a source.
#[derive(Debug, Clone)]
pub enum ListingMode {
    Rss { feed_urls: Vec<String> },
    PaginatedHtml { listing_roots: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct Source {
    pub slug: &'static str,
    pub display_name: &'static str,
    pub base_url: &'static str,
    pub listing: ListingMode,
    pub extractor: Extractor,
    pub genre_override: Option<&'static str>,
}

/// Global accept patterns: a candidate URL must contain at least one of
/// these substrings to be considered an article link.
pub const URL_ACCEPT_PATTERNS: &[&str] = &[
    "/haberi/",
    "/haber/",
    "/news/",
    "/gundem/",
    "/spor/",
    "/yasam/",
    "/dunya/",
    "/turkiye/",
    "/ekonomi/",
    "/teknoloji/",
    "/siyaset/",
    "/sondakika/",
    "/son-dakika/",
    "/son_dakika/",
    "/son-24-saat/",
    "/daily/",
    "/kategori/1/",
    "/kategori/2/",
    "/kategori/3/",
    "/kategori/4/",
    "/kategori/5/",
    "/kategori/6/",
    "/kategori/7/",
    "/yazi/",
    "/2024/",
    "/2025/",
    "/sondakika-haberleri/",
];

/// Global reject patterns: a candidate URL containing any of these is
/// never treated as an article link, regardless of accept matches.
pub const URL_REJECT_PATTERNS: &[&str] = &[
    "/galeri/",
    "/foto/",
    "/foto-haber/",
    "/video/",
    "/video-haber/",
    "/foto_haber/",
    "/video_haber/",
    "/fotohaber/",
    "/videohaber/",
    "/cdn-cgi/",
    "/email-protection/",
];

pub fn accepts_url(url: &str) -> bool {
    if URL_REJECT_PATTERNS.iter().any(|p| url.contains(p)) {
        return false;
    }
    URL_ACCEPT_PATTERNS.iter().any(|p| url.contains(p))
}

fn paginated(slug: &'static str, display_name: &'static str, base_url: &'static str) -> Source {
    Source {
        slug,
        display_name,
        base_url,
        listing: ListingMode::PaginatedHtml {
            listing_roots: vec![base_url.to_string()],
        },
        extractor: Extractor::Generic,
        genre_override: None,
    }
}

fn rss(
    slug: &'static str,
    display_name: &'static str,
    base_url: &'static str,
    feed_urls: &[&'static str],
) -> Source {
    Source {
        slug,
        display_name,
        base_url,
        listing: ListingMode::Rss {
            feed_urls: feed_urls.iter().map(|s| s.to_string()).collect(),
        },
        extractor: Extractor::Generic,
        genre_override: None,
    }
}

fn with_extractor(mut source: Source, extractor: Extractor) -> Source {
    source.extractor = extractor;
    source
}

fn with_genre_override(mut source: Source, genre: &'static str) -> Source {
    source.genre_override = Some(genre);
    source
}

/// The full source catalog, recovered from the original prototype's
/// `SOURCE_URLS`/`rss_sources` dictionaries.
pub fn default_sources() -> Vec<Source> {
    vec![
        with_extractor(
            rss(
                "nefes",
                "Nefes",
                "https://www.nefes.com.tr/",
                &["https://www.nefes.com.tr/rss"],
            ),
            Extractor::Nefes,
        ),
        paginated("diken", "Diken", "https://www.diken.com.tr/"),
        with_extractor(
            paginated("evrensel", "Evrensel", "https://www.evrensel.net/"),
            Extractor::Evrensel,
        )
        .with_category_roots(10),
        rss(
            "sozcu",
            "Sözcü",
            "https://www.sozcu.com.tr/",
            &[
                "https://www.sozcu.com.tr/feeds-rss-category-ekonomi",
                "https://www.sozcu.com.tr/feeds-rss-category-spor",
                "https://www.sozcu.com.tr/feeds-rss-category-gundem",
                "https://www.sozcu.com.tr/feeds-son-dakika",
                "https://www.sozcu.com.tr/feeds-haberler",
                "https://www.sozcu.com.tr/feeds-rss-category-dunya",
            ],
        ),
        with_extractor(
            paginated("sendika", "Sendika", "https://www.sendika.org/"),
            Extractor::Sendika,
        ),
        with_extractor(
            paginated("haber_sol", "Haber Sol", "https://haber.sol.org.tr/"),
            Extractor::HaberSol,
        ),
        with_extractor(
            rss(
                "gazete_duvar",
                "Gazete Duvar",
                "https://www.gazeteduvar.com.tr/",
                &["https://www.gazeteduvar.com.tr/export/rss"],
            ),
            Extractor::GazeteDuvar,
        ),
        paginated(
            "gercek_gundem",
            "Gerçek Gündem",
            "https://www.gercekgundem.com/",
        ),
        rss(
            "tele1",
            "Tele1",
            "https://tele1.com.tr/",
            &[
                "https://tele1.com.tr/rss",
                "https://www.tele1.com.tr/rss/tum-mansetler",
                "https://www.tele1.com.tr/rss/bilim-ve-teknoloji-evreni",
            ],
        ),
        rss(
            "artigercek",
            "Artı Gerçek",
            "https://artigercek.com/",
            &["https://artigercek.com/export/rss"],
        ),
        rss(
            "politikyol",
            "Politikyol",
            "https://www.politikyol.com/",
            &[
                "https://www.politikyol.com/rss",
                "https://www.politikyol.com/rss/ekonomi",
                "https://www.politikyol.com/rss/gundem",
                "https://www.politikyol.com/rss/emek",
                "https://www.politikyol.com/rss/politika",
                "https://www.politikyol.com/rss/spor",
            ],
        ),
        rss(
            "halktv",
            "Halk TV",
            "https://www.halktv.com.tr/",
            &["https://halktv.com.tr/service/rss.php"],
        ),
        rss(
            "trt_haber",
            "TRT Haber",
            "https://www.trthaber.com/",
            &["https://www.trthaber.com/sondakika.rss"],
        ),
        paginated("milliyet", "Milliyet", "https://www.milliyet.com.tr/"),
        paginated("hurriyet", "Hürriyet", "https://www.hurriyet.com.tr/"),
        paginated("cumhuriyet", "Cumhuriyet", "https://www.cumhuriyet.com.tr/"),
        with_extractor(
            paginated("ntv", "NTV", "https://www.ntv.com.tr/"),
            Extractor::Ntv,
        ),
        paginated("ahaber", "A Haber", "https://www.ahaber.com.tr/"),
        with_extractor(
            paginated("cnnturk", "CNN Türk", "https://www.cnnturk.com/"),
            Extractor::CnnTurk,
        ),
        with_extractor(
            paginated("sabah", "Sabah", "https://www.sabah.com.tr/"),
            Extractor::Sabah,
        ),
        with_genre_override(
            rss(
                "haberturk",
                "Habertürk",
                "https://www.haberturk.com/",
                &[
                    "https://www.haberturk.com/rss",
                    "https://www.haberturk.com/rss/ekonomi.xml",
                    "https://www.haberturk.com/rss/spor.xml",
                    "https://www.haberturk.com/rss/kategori/siyaset.xml",
                    "https://www.haberturk.com/rss/kategori/is-yasam.xml",
                    "https://www.haberturk.com/rss/kategori/gundem.xml",
                    "https://www.haberturk.com/rss/kategori/dunya.xml",
                    "https://www.haberturk.com/rss/kategori/teknoloji.xml",
                ],
            ),
            "unknown",
        ),
        paginated("ensonhaber", "Ensonhaber", "https://www.ensonhaber.com/"),
        paginated("posta", "Posta", "https://www.posta.com.tr/"),
        paginated("takvim", "Takvim", "https://www.takvim.com.tr/"),
        rss(
            "yeni_safak",
            "Yeni Şafak",
            "https://www.yenisafak.com/",
            &[
                "https://www.yenisafak.com/rss?xml=gundem",
                "https://www.yenisafak.com/rss?xml=ekonomi",
                "https://www.yenisafak.com/rss?xml=spor",
                "https://www.yenisafak.com/rss?xml=dunya",
                "https://www.yenisafak.com/rss?xml=sondakika",
                "https://www.yenisafak.com/rss?xml=teknoloji",
                "https://www.yenisafak.com/rss?xml=saglik",
                "https://www.yenisafak.com/rss?xml=yasam",
                "https://www.yenisafak.com/rss?xml=kultur-sanat",
            ],
        ),
        paginated("star", "Star", "https://www.star.com.tr/"),
        paginated(
            "turkiye_gazetesi",
            "Türkiye Gazetesi",
            "https://www.turkiyegazetesi.com.tr/",
        ),
        paginated("dunya", "Dünya", "https://www.dunya.com/"),
        paginated("birgun", "BirGün", "https://www.birgun.net/"),
        with_extractor(
            paginated("t24", "T24", "https://t24.com.tr/"),
            Extractor::T24,
        ),
        paginated("bianet", "Bianet", "https://bianet.org/"),
        paginated(
            "hurriyet_daily_news",
            "Hurriyet Daily News",
            "https://www.hurriyetdailynews.com/",
        ),
        paginated(
            "daily_sabah",
            "Daily Sabah",
            "https://www.dailysabah.com/",
        ),
    ]
}

impl Source {
    /// Evrensel has ten numbered category roots instead of one paginated
    /// base URL; modeling this as extra listing roots means no special
    /// case is needed downstream in the Listing Discoverer.
    fn with_category_roots(mut self, count: u32) -> Self {
        if let ListingMode::PaginatedHtml { listing_roots } = &mut self.listing {
            *listing_roots = (1..=count)
                .map(|i| format!("{}kategori/{}", self.base_url, i))
                .collect();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_expected_source_count() {
        let sources = default_sources();
        assert_eq!(sources.len(), 33);
    }

    #[test]
    fn haber_sol_and_gazete_duvar_have_dedicated_extractors() {
        let sources = default_sources();
        let haber_sol = sources.iter().find(|s| s.slug == "haber_sol").unwrap();
        assert_eq!(haber_sol.extractor, Extractor::HaberSol);
        let gazete_duvar = sources.iter().find(|s| s.slug == "gazete_duvar").unwrap();
        assert_eq!(gazete_duvar.extractor, Extractor::GazeteDuvar);
    }

    #[test]
    fn haberturk_has_fixed_genre_override() {
        let sources = default_sources();
        let haberturk = sources.iter().find(|s| s.slug == "haberturk").unwrap();
        assert_eq!(haberturk.genre_override, Some("unknown"));
    }

    #[test]
    fn evrensel_has_ten_category_roots() {
        let sources = default_sources();
        let evrensel = sources.iter().find(|s| s.slug == "evrensel").unwrap();
        match &evrensel.listing {
            ListingMode::PaginatedHtml { listing_roots } => assert_eq!(listing_roots.len(), 10),
            _ => panic!("expected paginated mode"),
        }
    }

    #[test]
    fn accept_reject_patterns_gate_correctly() {
        assert!(accepts_url("https://example.com/haber/some-news-1"));
        assert!(!accepts_url("https://example.com/galeri/haber/1"));
        assert!(!accepts_url("https://example.com/about"));
    }
}
