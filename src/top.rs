use anyhow::{Result, bail};
use log::info;

use crate::{
    aggregate::AggregateTable,
    cli::TopArgs,
    report::{self, format_metric},
};

pub fn execute(args: &TopArgs) -> Result<()> {
    let table = AggregateTable::read_csv(&args.input)?;
    info!(
        "Ranking {} group(s) from '{}'",
        table.rows.len(),
        args.input.display()
    );

    if !args.disparity.is_empty() {
        let [left, right] = args.disparity.as_slice() else {
            bail!(
                "--disparity expects exactly two metric names separated by a comma, got {}",
                args.disparity.len()
            );
        };
        let ranked = table.top_by_disparity(left, right, args.limit)?;
        let headers = vec![
            table.key_column.clone(),
            left.clone(),
            right.clone(),
            "disparity".to_string(),
        ];
        let rows = ranked
            .iter()
            .map(|(row, gap)| {
                vec![
                    row.key.clone(),
                    format_metric(table.metric(row, left).unwrap_or(f64::NAN)),
                    format_metric(table.metric(row, right).unwrap_or(f64::NAN)),
                    format_metric(*gap),
                ]
            })
            .collect::<Vec<_>>();
        report::print_table(&headers, &rows);
        return Ok(());
    }

    let Some(metric) = args.metric.as_deref() else {
        bail!("Either --metric or --disparity must be provided");
    };
    let ranked = table.top_by(metric, args.limit)?;
    let headers = vec![table.key_column.clone(), metric.to_string()];
    let rows = ranked
        .iter()
        .map(|row| {
            vec![
                row.key.clone(),
                format_metric(table.metric(row, metric).unwrap_or(f64::NAN)),
            ]
        })
        .collect::<Vec<_>>();
    report::print_table(&headers, &rows);
    Ok(())
}
