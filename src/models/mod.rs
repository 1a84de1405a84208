use serde::{Deserialize, Serialize};

/// A registered user and their running total for the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,        // Telegram user id
    pub name: String,
    pub goal: f64,      // daily budget, kcal
    pub eaten: f64,     // eaten today, kcal
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub kcal_per_100g: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub goal: f64,
    pub eaten: f64,
    pub remaining: f64,
}

impl DailyStats {
    pub fn new(goal: f64, eaten: f64) -> Self {
        Self {
            goal,
            eaten,
            remaining: (goal - eaten).max(0.0),
        }
    }
}

/// Where a user is inside the two-step registration conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationStep {
    AwaitingName,
    AwaitingGoal { name: String },
}

/// One resolved (product, amount) pair from a food message.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub product: String,
    pub amount: f64,
    pub kcal: f64,
}

impl std::fmt::Display for LineItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} г → {:.1} ккал",
            capitalize(&self.product),
            self.amount,
            self.kcal
        )
    }
}

/// Outcome of resolving one message that matched at least one product.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeReport {
    pub items: Vec<LineItem>,
    pub total_kcal: f64,
}

impl IntakeReport {
    pub fn to_message(&self) -> String {
        let lines: Vec<String> = self.items.iter().map(|item| item.to_string()).collect();
        let mut response = format!("Добавлено:\n{}", lines.join("\n"));
        if self.items.len() > 1 {
            response.push_str(&format!("\n\nИтого: +{:.1} ккал", self.total_kcal));
        }
        response
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
