//! Trajectory reconstruction from the planner's position dump.
//!
//! The planner writes one whitespace-delimited matrix per run: `3 * Ncmd`
//! rows and one column per timestep. Rows `3i..3i+3` are the x, y and z
//! histories of agent `i`.

use glam::DVec3;

use crate::error::EvalError;

/// Raw numeric matrix, all rows the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionMatrix {
    rows: Vec<Vec<f64>>,
    columns: usize,
}

impl PositionMatrix {
    /// Build a matrix from rows.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::DataShape`] if rows differ in length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, EvalError> {
        let columns = rows.first().map_or(0, Vec::len);
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns) {
            return Err(EvalError::DataShape(format!(
                "row {index} has {} columns, row 0 has {columns}",
                row.len()
            )));
        }
        Ok(Self { rows, columns })
    }

    /// Parse whitespace-delimited text. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::DataShape`] for a non-numeric token or ragged rows.
    pub fn parse(text: &str) -> Result<Self, EvalError> {
        let rows = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line_no, line)| {
                line.split_whitespace()
                    .map(|token| {
                        token.parse::<f64>().map_err(|_| {
                            EvalError::DataShape(format!(
                                "line {}: `{token}` is not a number",
                                line_no + 1
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rows(rows)
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns (timesteps).
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns
    }

    /// A single row.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }
}

/// Per-agent position sequences indexed by timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectories {
    agents: Vec<Vec<DVec3>>,
}

impl Trajectories {
    /// Regroup a position matrix into `ncmd` trajectories.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::DataShape`] if `ncmd` is zero, the matrix does
    /// not have exactly `3 * ncmd` rows, or it has no columns.
    pub fn reconstruct(matrix: &PositionMatrix, ncmd: usize) -> Result<Self, EvalError> {
        if ncmd == 0 {
            return Err(EvalError::DataShape("cannot reconstruct zero agents".to_string()));
        }
        if matrix.row_count() != 3 * ncmd {
            return Err(EvalError::DataShape(format!(
                "trajectory has {} rows, expected 3 * Ncmd = {}",
                matrix.row_count(),
                3 * ncmd
            )));
        }
        if matrix.column_count() == 0 {
            return Err(EvalError::DataShape("trajectory has no timesteps".to_string()));
        }

        let agents = (0..ncmd)
            .map(|i| {
                let (xs, ys, zs) = (matrix.row(3 * i), matrix.row(3 * i + 1), matrix.row(3 * i + 2));
                (0..matrix.column_count())
                    .map(|k| DVec3::new(xs[k], ys[k], zs[k]))
                    .collect()
            })
            .collect();
        Ok(Self { agents })
    }

    /// Build directly from per-agent sequences.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::DataShape`] if there are no agents, no steps, or
    /// the sequences differ in length.
    pub fn from_agents(agents: Vec<Vec<DVec3>>) -> Result<Self, EvalError> {
        let steps = agents
            .first()
            .map(Vec::len)
            .ok_or_else(|| EvalError::DataShape("no agent trajectories".to_string()))?;
        if steps == 0 {
            return Err(EvalError::DataShape("trajectory has no timesteps".to_string()));
        }
        if let Some((index, path)) = agents.iter().enumerate().find(|(_, a)| a.len() != steps) {
            return Err(EvalError::DataShape(format!(
                "agent {index} has {} steps, agent 0 has {steps}",
                path.len()
            )));
        }
        Ok(Self { agents })
    }

    /// Number of agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Number of recorded timesteps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.agents[0].len()
    }

    /// One agent's positions, by timestep.
    #[must_use]
    pub fn agent(&self, index: usize) -> &[DVec3] {
        &self.agents[index]
    }

    /// Iterate agents' position sequences in agent order.
    pub fn iter(&self) -> impl Iterator<Item = &[DVec3]> {
        self.agents.iter().map(Vec::as_slice)
    }

    /// Simulated duration: `(steps - 1) * ts`.
    #[must_use]
    pub fn duration(&self, ts: f64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let intervals = (self.step_count() - 1) as f64;
        intervals * ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_AGENTS: &str = "\
        0 1 2\n\
        0 0 0\n\
        1 1 1\n\
        \n\
        5 5 5\n\
        6 7 8\n\
        9 9 9\n";

    #[test]
    fn test_parse_matrix() {
        let matrix = PositionMatrix::parse(TWO_AGENTS).unwrap();
        assert_eq!(matrix.row_count(), 6);
        assert_eq!(matrix.column_count(), 3);
        assert_eq!(matrix.row(4), &[6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_parse_rejects_ragged_and_garbage() {
        assert!(matches!(
            PositionMatrix::parse("1 2 3\n4 5\n"),
            Err(EvalError::DataShape(_))
        ));
        let err = PositionMatrix::parse("1 2 x\n").unwrap_err();
        assert!(err.to_string().contains("`x`"));
    }

    #[test]
    fn test_reconstruct_transposes_rows() {
        let matrix = PositionMatrix::parse(TWO_AGENTS).unwrap();
        let traj = Trajectories::reconstruct(&matrix, 2).unwrap();

        assert_eq!(traj.agent_count(), 2);
        assert_eq!(traj.step_count(), 3);
        assert_eq!(traj.agent(0)[2], DVec3::new(2.0, 0.0, 1.0));
        assert_eq!(traj.agent(1)[1], DVec3::new(5.0, 7.0, 9.0));
    }

    #[test]
    fn test_reconstruct_rejects_wrong_row_count() {
        let matrix = PositionMatrix::parse(TWO_AGENTS).unwrap();
        let err = Trajectories::reconstruct(&matrix, 3).unwrap_err();
        assert!(err.to_string().contains("expected 3 * Ncmd = 9"));
        assert!(Trajectories::reconstruct(&matrix, 0).is_err());
    }

    #[test]
    fn test_duration() {
        let matrix = PositionMatrix::parse(TWO_AGENTS).unwrap();
        let traj = Trajectories::reconstruct(&matrix, 2).unwrap();
        assert!((traj.duration(0.01) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_from_agents_validates_lengths() {
        assert!(Trajectories::from_agents(vec![]).is_err());
        assert!(Trajectories::from_agents(vec![vec![DVec3::ZERO], vec![]]).is_err());
        assert!(Trajectories::from_agents(vec![vec![DVec3::ZERO], vec![DVec3::ONE]]).is_ok());
    }
}
