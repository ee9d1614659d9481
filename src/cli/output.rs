//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::unlock::DecryptedQuerySet;
use crate::vault::QueryOption;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print the locked view of a vault: names and labels only.
pub fn print_options_table(options: &[QueryOption]) {
    if options.is_empty() {
        info("This vault holds no queries.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Label"]);

    for option in options {
        table.add_row(vec![option.name.clone(), option.label.clone()]);
    }

    println!("{table}");
}

/// Print the unlocked queries (Name, Label, Lines), marking the default.
pub fn print_queries_table(set: &DecryptedQuerySet) {
    let default_name = set.default_query().map(|q| q.name.as_str());

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["", "Name", "Label", "Lines"]);

    for query in set.iter() {
        let marker = if Some(query.name.as_str()) == default_name {
            "*"
        } else {
            ""
        };
        table.add_row(vec![
            marker.to_string(),
            query.name.clone(),
            query.label.clone(),
            query.text.lines().count().to_string(),
        ]);
    }

    println!("{table}");
}
