//! Console command that deletes all posts in a category.
//!
//! Usage: `cargo run --bin purge-category -- <category-name>`
//!
//! Asks for an interactive "yes" confirmation before deleting. A missing
//! category is a printed error, not a failure.

use std::io::{self, BufRead};
use std::path::Path;

use anyhow::Result;

use gazette::config::Config;
use gazette::db::{
    self,
    repositories::{SqlxCategoryRepository, SqlxGroupRepository, SqlxPostRepository},
};
use gazette::services::ensure_groups;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let category_name = match args.next() {
        Some(name) => name,
        None => {
            eprintln!("Usage: purge-category <category-name>");
            std::process::exit(2);
        }
    };

    let config = Config::load_with_env(Path::new("config.yml"))?;
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;
    ensure_groups(&SqlxGroupRepository::boxed(pool.clone())).await?;

    let category_repo = SqlxCategoryRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());

    let category = match category_repo.get_by_name(&category_name).await? {
        Some(category) => category,
        None => {
            println!("Категория \"{}\" не найдена", category_name);
            return Ok(());
        }
    };

    println!(
        "Вы действительно хотите удалить все статьи в категории {}? yes/no",
        category.name
    );
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;

    if answer.trim().eq_ignore_ascii_case("yes") {
        let count = post_repo.delete_by_category(category.id).await?;
        println!(
            "Успешно удалено {} постов из категории {}",
            count, category.name
        );
    } else {
        println!("Отменено");
    }

    Ok(())
}
