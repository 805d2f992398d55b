use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::arithmetic::CheckedArithmetic;
use crate::error::ValuationError;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate, SensitivityVariable};
use crate::valuation::dcf::dcf_value;
use crate::valuation::projection::DEFAULT_HORIZON;
use crate::valuation::terminal::{TerminalAssumption, TerminalMethod};
use crate::ValuationResult;

/// Discount-rate columns span the base rate ± this amount.
pub const DISCOUNT_RATE_SPAN: Rate = dec!(0.03);
pub const DISCOUNT_RATE_STEP: Rate = dec!(0.01);

/// Terminal-growth rows span the base terminal growth ± this amount.
pub const TERMINAL_GROWTH_SPAN: Rate = dec!(0.01);
pub const TERMINAL_GROWTH_STEP: Rate = dec!(0.005);

/// Exit-multiple rows span the base multiple ± this amount.
pub const EXIT_MULTIPLE_SPAN: Multiple = dec!(5);
pub const EXIT_MULTIPLE_STEP: Multiple = dec!(2);

/// The base case every grid cell perturbs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityBase {
    pub base_fcf: Money,
    /// Growth applied to the explicit projection in every cell
    pub growth_rate: Rate,
    pub discount_rate: Rate,
    pub terminal_growth: Rate,
    pub exit_multiple: Multiple,
    #[serde(default = "default_horizon")]
    pub horizon: u32,
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub base: SensitivityBase,
    pub mode: TerminalMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellFailure {
    pub position: GridPosition,
    pub reason: String,
}

/// Intrinsic value over a terminal-parameter × discount-rate grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub mode: TerminalMethod,
    /// "terminal_growth" or "exit_multiple"
    pub row_variable: String,
    pub row_values: Vec<Decimal>,
    pub column_values: Vec<Rate>,
    /// `cells[row][column]`; `None` where that DCF could not be valued
    pub cells: Vec<Vec<Option<Money>>>,
    /// Cell holding the unperturbed base case, when it lies on the grid
    pub base_case_position: Option<GridPosition>,
    pub failed_cells: Vec<CellFailure>,
}

impl SensitivityGrid {
    pub fn cell(&self, row: usize, column: usize) -> Option<Money> {
        self.cells.get(row).and_then(|r| r.get(column)).copied().flatten()
    }

    pub fn base_case_value(&self) -> Option<Money> {
        self.base_case_position
            .and_then(|p| self.cell(p.row, p.column))
    }
}

/// Values from `min` to `max` inclusive in `step` increments; `max` is
/// appended when the step does not land on it.
pub fn generate_sweep_values(var: &SensitivityVariable) -> ValuationResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(ValuationError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current = match current.checked_add(var.step) {
            Some(next) => next,
            None => break,
        };
    }
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }
    Ok(values)
}

/// Row and column axes for a mode around the base case.
pub fn grid_axes(
    base: &SensitivityBase,
    mode: TerminalMethod,
) -> ValuationResult<(SensitivityVariable, SensitivityVariable)> {
    let rows = match mode {
        TerminalMethod::GordonGrowth => SensitivityVariable {
            name: "terminal_growth".into(),
            min: base.terminal_growth.safe_sub(TERMINAL_GROWTH_SPAN)?,
            max: base.terminal_growth.safe_add(TERMINAL_GROWTH_SPAN)?,
            step: TERMINAL_GROWTH_STEP,
        },
        TerminalMethod::ExitMultiple => SensitivityVariable {
            name: "exit_multiple".into(),
            min: base.exit_multiple.safe_sub(EXIT_MULTIPLE_SPAN)?,
            max: base.exit_multiple.safe_add(EXIT_MULTIPLE_SPAN)?,
            step: EXIT_MULTIPLE_STEP,
        },
    };
    let columns = SensitivityVariable {
        name: "discount_rate".into(),
        min: base.discount_rate.safe_sub(DISCOUNT_RATE_SPAN)?,
        max: base.discount_rate.safe_add(DISCOUNT_RATE_SPAN)?,
        step: DISCOUNT_RATE_STEP,
    };
    Ok((rows, columns))
}

/// Value every cell of the grid with an independent DCF run.
///
/// A cell that cannot be valued (discount rate at or below terminal
/// growth, a non-positive exit multiple, a value outside the `Decimal`
/// range) is left `None` and recorded in `failed_cells`; the rest of the
/// grid is still produced.
pub fn sensitivity_grid(
    base: &SensitivityBase,
    mode: TerminalMethod,
) -> ValuationResult<SensitivityGrid> {
    if base.horizon == 0 {
        return Err(ValuationError::assumption(
            "horizon",
            "Projection horizon must be at least one year",
        ));
    }

    let (row_var, column_var) = grid_axes(base, mode)?;
    let row_values = generate_sweep_values(&row_var)?;
    let column_values = generate_sweep_values(&column_var)?;

    let mut failed_cells = Vec::new();
    let mut cells = Vec::with_capacity(row_values.len());
    for (i, row_value) in row_values.iter().enumerate() {
        let terminal = match mode {
            TerminalMethod::GordonGrowth => TerminalAssumption::GordonGrowth {
                terminal_growth: *row_value,
            },
            TerminalMethod::ExitMultiple => TerminalAssumption::ExitMultiple {
                multiple: *row_value,
            },
        };
        let row = column_values
            .iter()
            .enumerate()
            .map(|(j, rate)| {
                match dcf_value(base.base_fcf, base.growth_rate, base.horizon, &terminal, *rate) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::debug!(row = i, column = j, error = %e, "sensitivity cell skipped");
                        failed_cells.push(CellFailure {
                            position: GridPosition { row: i, column: j },
                            reason: e.to_string(),
                        });
                        None
                    }
                }
            })
            .collect();
        cells.push(row);
    }

    let base_row_value = match mode {
        TerminalMethod::GordonGrowth => base.terminal_growth,
        TerminalMethod::ExitMultiple => base.exit_multiple,
    };
    let base_case_position = row_values
        .iter()
        .position(|v| *v == base_row_value)
        .zip(column_values.iter().position(|v| *v == base.discount_rate))
        .map(|(row, column)| GridPosition { row, column });

    Ok(SensitivityGrid {
        mode,
        row_variable: row_var.name,
        row_values,
        column_values,
        cells,
        base_case_position,
        failed_cells,
    })
}

/// Build the grid with warnings and metadata.
pub fn calculate_sensitivity(
    input: &SensitivityInput,
) -> ValuationResult<ComputationOutput<SensitivityGrid>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let grid = sensitivity_grid(&input.base, input.mode)?;

    for failure in &grid.failed_cells {
        warnings.push(format!(
            "{} = {}, discount rate = {}: {}",
            grid.row_variable,
            grid.row_values[failure.position.row],
            grid.column_values[failure.position.column],
            failure.reason
        ));
    }
    if grid.base_case_position.is_none() {
        warnings.push(format!(
            "Base case {} is not a grid point; no centre cell highlighted",
            grid.row_variable
        ));
    }

    let methodology = match input.mode {
        TerminalMethod::GordonGrowth => "DCF sensitivity: terminal growth vs discount rate",
        TerminalMethod::ExitMultiple => "DCF sensitivity: exit multiple vs discount rate",
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(methodology, input, warnings, elapsed, grid))
}
