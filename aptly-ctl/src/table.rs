// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Plain-text table output. */

use std::io::Write;

/// Render rows as a space-separated table with a dashed header underline.
pub fn render_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = Vec::new();
    write_table(&mut out, header, rows).expect("writing to a Vec cannot fail");
    String::from_utf8(out).expect("table output is UTF-8")
}

/// Print a table to stdout.
pub fn print_table(header: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(header, rows));
}

fn write_table(out: &mut impl Write, header: &[&str], rows: &[Vec<String>]) -> std::io::Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut widths = header.iter().map(|h| h.len()).collect::<Vec<_>>();
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            if index < widths.len() {
                widths[index] = widths[index].max(cell.len());
            }
        }
    }

    let mut all_rows = vec![
        header.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
        widths.iter().map(|w| "-".repeat(*w)).collect(),
    ];
    all_rows.extend(rows.iter().cloned());

    for row in all_rows {
        let rendered = row
            .iter()
            .enumerate()
            .map(|(index, cell)| format!("{:width$}", cell, width = widths[index]))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{}", rendered.trim_end())?;
    }

    Ok(())
}
