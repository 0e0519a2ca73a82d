//! Wine list lines as they come out of OCR on photographed menus.

/// One scraped line and what parsing should recover from it.
#[derive(Debug, Clone)]
pub struct WineListLine {
    pub text: &'static str,
    pub vintage: Option<i32>,
    pub price: Option<f64>,
    pub description: &'static str,
}

pub const WINE_LIST_LINES: &[WineListLine] = &[
    WineListLine {
        text: "Opus One 2015 $350",
        vintage: Some(2015),
        price: Some(350.0),
        description: "Clean line with vintage and price",
    },
    WineListLine {
        text: "Barolo Riserva, Giacomo Conterno '98 .... $1,200",
        vintage: Some(1998),
        price: Some(1200.0),
        description: "Abbreviated vintage, dot leaders, comma price",
    },
    WineListLine {
        text: "CHÂTEAU MARGAUX Premier Grand Cru Classé 2010 $1,450.00",
        vintage: Some(2010),
        price: Some(1450.0),
        description: "Upper case with diacritics",
    },
    WineListLine {
        text: "Cloudy Bay Sauv Blanc, Marlborough NZ  $58",
        vintage: None,
        price: Some(58.0),
        description: "Synonym abbreviation, no vintage",
    },
    WineListLine {
        text: "Krug Grande Cuvée 170ème Édition",
        vintage: None,
        price: None,
        description: "No vintage, no price",
    },
    WineListLine {
        text: "Domaine Leflaive Puligny-Montrachet '05 $245",
        vintage: Some(2005),
        price: Some(245.0),
        description: "Hyphenated appellation, 20xx short vintage",
    },
];
