use serde_json::Value;
use std::io;

use super::{scalar, GridView, RECORD_KEYS};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write output as CSV to stdout.
///
/// A sensitivity grid is written as a matrix, a result carrying a record
/// list (peer rows, rankings, projections) as one line per record, and any
/// other result as field,value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let outcome = match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => write_result(&mut wtr, result),
            None => write_pairs(&mut wtr, map.iter()),
        },
        Value::Array(arr) => write_records(&mut wtr, arr),
        other => wtr.write_record([scalar(other)]),
    };

    if let Err(e) = outcome.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        eprintln!("CSV output error: {e}");
    }
}

fn write_result(wtr: &mut StdoutWriter<'_>, result: &Value) -> csv::Result<()> {
    if let Some(grid) = GridView::from_result(result) {
        wtr.write_record(grid.header())?;
        for line in grid.body() {
            wtr.write_record(line)?;
        }
        return Ok(());
    }

    let Value::Object(map) = result else {
        return wtr.write_record([scalar(result)]);
    };
    for key in RECORD_KEYS {
        if let Some(Value::Array(records)) = map.get(key) {
            return write_records(wtr, records);
        }
    }
    write_pairs(wtr, map.iter())
}

fn write_pairs<'v>(
    wtr: &mut StdoutWriter<'_>,
    pairs: impl Iterator<Item = (&'v String, &'v Value)>,
) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in pairs {
        wtr.write_record([key.as_str(), &scalar(val)])?;
    }
    Ok(())
}

fn write_records(wtr: &mut StdoutWriter<'_>, arr: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            wtr.write_record([scalar(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    wtr.write_record(&headers)?;
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(scalar).unwrap_or_default())
                .collect();
            wtr.write_record(&row)?;
        }
    }
    Ok(())
}
