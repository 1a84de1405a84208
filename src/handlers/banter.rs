//! Canned replies to messages that mention buckwheat slang ("греч...").
//! Cosmetic only: never touches the ledger.

const TRIGGER: &str = "греч";

const FOOD_KEYWORDS: &[&str] = &[
    "съел", "сел", "скушал", "поел", "ем", "жру", "закинул", "грамм", "гр ", "кило", "порцию",
    "100", "200", "150",
];

const HOMONYM_KEYWORDS: &[&str] = &["греция", "греческий", "афины", "олимп"];

const FOOD_JOKE: &str = "Гречка level 100 активирован 🥣💪\nСколько уже кг сухой в тебя вошло?";
const HOMONYM_JOKE: &str = "Эй, это не та гречка, брат 😭";

/// Food keywords are checked first; the first group that matches wins.
pub fn joke_for(text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    if !text.contains(TRIGGER) {
        return None;
    }

    if FOOD_KEYWORDS.iter().any(|word| text.contains(word)) {
        Some(FOOD_JOKE)
    } else if HOMONYM_KEYWORDS.iter().any(|word| text.contains(word)) {
        Some(HOMONYM_JOKE)
    } else {
        None
    }
}
