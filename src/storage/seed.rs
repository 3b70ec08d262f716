use chrono::Utc;

use crate::todo::data::{Category, Task};

pub const TODO_CATEGORY_ID: &str = "default-todo";
pub const CHORES_CATEGORY_ID: &str = "default-chores";

const TODO_TITLES: [&str; 5] = [
    "Drink a glass of water before the coffee",
    "Reply to the message I have been ignoring",
    "Write down one thing that went well yesterday",
    "Take a ten minute walk without my phone",
    "Plan tomorrow before bed",
];

const CHORE_TITLES: [&str; 5] = [
    "Make the bed",
    "Water the plants",
    "Empty the dishwasher",
    "Take out the recycling",
    "Tidy the desk",
];

pub fn default_categories() -> Vec<Category> {
    let now = Utc::now();
    vec![
        Category {
            id: TODO_CATEGORY_ID.to_string(),
            name: "To Do".to_string(),
            color: "#ff6b6b".to_string(),
            order: 0,
            created_at: now,
            updated_at: now,
        },
        Category {
            id: CHORES_CATEGORY_ID.to_string(),
            name: "Chores".to_string(),
            color: "#4ecdc4".to_string(),
            order: 1,
            created_at: now,
            updated_at: now,
        },
    ]
}

pub fn default_tasks() -> Vec<Task> {
    let now = Utc::now();
    let todo = TODO_TITLES.iter().map(|title| (TODO_CATEGORY_ID, *title));
    let chores = CHORE_TITLES.iter().map(|title| (CHORES_CATEGORY_ID, *title));

    todo.enumerate()
        .chain(chores.enumerate())
        .enumerate()
        .map(|(n, (order, (category_id, title)))| Task {
            id: format!("default-task-{}", n + 1),
            title: title.to_string(),
            completed: false,
            category_id: category_id.to_string(),
            order,
            unit_value: None,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_ten_tasks_over_two_categories() {
        let categories = default_categories();
        let tasks = default_tasks();

        assert_eq!(categories.len(), 2);
        assert_eq!(tasks.len(), 10);
        assert_eq!(tasks[0].id, "default-task-1");
        assert_eq!(tasks[9].id, "default-task-10");

        for category in &categories {
            let orders: Vec<usize> = tasks
                .iter()
                .filter(|t| t.category_id == category.id)
                .map(|t| t.order)
                .collect();
            assert_eq!(orders, vec![0, 1, 2, 3, 4]);
        }
    }
}
