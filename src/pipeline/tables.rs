//! Heuristic tables consumed by the classifier and the genre normalizer.
//!
//! The defaults reproduce the curated lists the project has always shipped
//! with. They deserialize from the `[heuristics]` and `[genres]` sections of
//! `config.toml`, so any of them can be replaced without touching code.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicTables {
    /// Lowercase substrings identifying well-known Japanese studios.
    pub japanese_studios: Vec<String>,

    /// Lowercase producer substrings indicating a Korean production house.
    pub korean_indicators: Vec<String>,

    /// Lowercase producer substrings indicating a Chinese production house.
    pub chinese_indicators: Vec<String>,

    /// Genre or community tags marking explicit content.
    pub adult_tags: Vec<String>,

    /// Demographic, genre or community tags marking children's titles.
    pub kid_tags: Vec<String>,
}

impl Default for HeuristicTables {
    fn default() -> Self {
        Self {
            japanese_studios: strings(&[
                "a-1 pictures",
                "trigger",
                "mappa",
                "ufotable",
                "bones",
                "kyoto animation",
                "madhouse",
                "wit studio",
                "production i.g",
                "cloverworks",
                "shaft",
                "j.c.staff",
                "toei animation",
                "studio deen",
                "david production",
                "sunrise",
                "gainax",
                "pierrot",
                "silver link",
                "lerche",
                "kinema citrus",
                "white fox",
                "doga kobo",
                "p.a. works",
                "studio ghibli",
                "tms entertainment",
                "olm",
                "toho animation",
            ]),
            korean_indicators: strings(&["netmarble", "kakao", "naver", "webtoon", "d&c media"]),
            chinese_indicators: strings(&["tencent", "bilibili", "haoliners"]),
            adult_tags: strings(&["Hentai", "R18", "里番"]),
            kid_tags: strings(&["Kids", "儿童", "子供向", "子供向け", "低龄"]),
        }
    }
}

impl HeuristicTables {
    /// Korean and Chinese indicators as one list; the classifier does not
    /// distinguish between them.
    pub fn foreign_indicators(&self) -> impl Iterator<Item = &str> {
        self.korean_indicators
            .iter()
            .chain(self.chinese_indicators.iter())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenreTables {
    /// Raw tag -> canonical genre. Several raw tags may share one target.
    pub vocabulary: BTreeMap<String, String>,

    /// Tags that are never genres: formats, regions, years, source material.
    pub excluded_tags: Vec<String>,
}

impl Default for GenreTables {
    fn default() -> Self {
        let pairs: &[(&str, &str)] = &[
            ("SF", "科幻"),
            ("Science Fiction", "科幻"),
            ("科幻", "科幻"),
            ("战斗", "动作"),
            ("Action", "动作"),
            ("动作", "动作"),
            ("格斗", "动作"),
            ("恋爱", "爱情"),
            ("Romance", "爱情"),
            ("爱情", "爱情"),
            ("纯爱", "爱情"),
            ("搞笑", "喜剧"),
            ("Comedy", "喜剧"),
            ("喜剧", "喜剧"),
            ("日常", "日常"),
            ("Slice of Life", "日常"),
            ("校园", "校园"),
            ("School", "校园"),
            ("学园", "校园"),
            ("奇幻", "奇幻"),
            ("Fantasy", "奇幻"),
            ("异世界", "奇幻"),
            ("魔法", "奇幻"),
            ("穿越", "奇幻"),
            ("冒险", "冒险"),
            ("Adventure", "冒险"),
            ("悬疑", "悬疑"),
            ("Mystery", "悬疑"),
            ("推理", "悬疑"),
            ("惊悚", "惊悚"),
            ("Thriller", "惊悚"),
            ("恐怖", "恐怖"),
            ("Horror", "恐怖"),
            ("运动", "运动"),
            ("Sports", "运动"),
            ("竞技", "运动"),
            ("机战", "机战"),
            ("Mecha", "机战"),
            ("萝卜", "机战"),
            ("音乐", "音乐"),
            ("Music", "音乐"),
            ("歌舞", "音乐"),
            ("偶像", "音乐"),
            ("治愈", "治愈"),
            ("治愈系", "治愈"),
            ("致郁", "致郁"),
            ("致郁系", "致郁"),
            ("百合", "百合"),
            ("GL", "百合"),
            ("耽美", "耽美"),
            ("BL", "耽美"),
            ("后宫", "后宫"),
            ("逆后宫", "逆后宫"),
            ("励志", "励志"),
            ("历史", "历史"),
            ("战争", "战争"),
            ("犯罪", "犯罪"),
            ("职场", "职场"),
            ("萌", "萌系"),
            ("萌系", "萌系"),
        ];

        let vocabulary = pairs
            .iter()
            .map(|(raw, canonical)| ((*raw).to_string(), (*canonical).to_string()))
            .collect();

        Self {
            vocabulary,
            excluded_tags: strings(&[
                // broadcast formats
                "TV", "OVA", "OAD", "WEB", "TVA", "TV动画", "剧场版", "电影", "Movie", "Special",
                "特别篇",
                // countries and regions
                "日本", "中国", "美国", "国产", "日本动画", "欧美", "韩国", "国产动画", "欧美动画",
                // seasonal labels the pattern rules do not catch
                "1月新番", "4月新番", "7月新番", "10月新番", "2024冬", "2024春", "2024夏",
                "2024秋",
                // source material
                "原创", "漫改", "小说改", "游戏改", "轻小说改", "漫画改", "改编", "原作", "Manga",
                "Light Novel",
                // meta
                "续作", "补番", "童年", "怀旧", "新番", "完结", "长篇", "短篇", "泡面番", "连载中",
            ]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vocabulary_is_many_to_one() {
        let tables = GenreTables::default();
        assert_eq!(tables.vocabulary["SF"], "科幻");
        assert_eq!(tables.vocabulary["Science Fiction"], "科幻");
        assert_eq!(tables.vocabulary["异世界"], "奇幻");
    }

    #[test]
    fn test_foreign_indicators_cover_both_lists() {
        let tables = HeuristicTables::default();
        let all: Vec<&str> = tables.foreign_indicators().collect();
        assert!(all.contains(&"kakao"));
        assert!(all.contains(&"bilibili"));
    }

    #[test]
    fn test_tables_deserialize_partially() {
        let toml_str = r#"
            japanese_studios = ["studio x"]
        "#;
        let tables: HeuristicTables = toml::from_str(toml_str).unwrap();
        assert_eq!(tables.japanese_studios, vec!["studio x".to_string()]);
        assert!(tables.adult_tags.iter().any(|t| t == "Hentai"));
        assert!(tables.kid_tags.iter().any(|t| t == "儿童"));
    }
}
