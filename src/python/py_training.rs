//! Training data type bindings for Python.

use numpy::{PyArray1, PyArray2, PyArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyBytes;

use crate::mcts::SearchMode;
use crate::training::{decode_examples, encode_examples, ExperienceBuffer, Step, TrainingExample, Trajectory};

use super::py_core::PyPlayerId;
use super::py_nn::PyEncodedState;

/// Python wrapper for Step.
#[pyclass(name = "Step")]
#[derive(Clone)]
pub struct PyStep(pub Step);

#[pymethods]
impl PyStep {
    #[getter]
    fn encoded_state(&self) -> PyEncodedState {
        PyEncodedState(self.0.encoded_state.clone())
    }

    /// Pruned policy target, `None` for fast-searched moves.
    #[getter]
    fn policy_target(&self) -> Option<Vec<f32>> {
        self.0.policy_target.clone()
    }

    /// Visit distribution the move was picked from.
    #[getter]
    fn distribution(&self) -> Vec<f32> {
        self.0.distribution.clone()
    }

    #[getter]
    fn action(&self) -> usize {
        self.0.action
    }

    #[getter]
    fn player(&self) -> PyPlayerId {
        PyPlayerId(self.0.player)
    }

    #[getter]
    fn move_number(&self) -> usize {
        self.0.move_number
    }

    /// `True` when the move got a full search.
    #[getter]
    fn full_search(&self) -> bool {
        self.0.mode == SearchMode::Full
    }

    fn __repr__(&self) -> String {
        format!(
            "Step(move={}, player={}, action={}, mode={:?})",
            self.0.move_number, self.0.player.0, self.0.action, self.0.mode
        )
    }
}

/// Python wrapper for Trajectory.
#[pyclass(name = "Trajectory")]
#[derive(Clone)]
pub struct PyTrajectory(pub Trajectory);

#[pymethods]
impl PyTrajectory {
    #[getter]
    fn steps(&self) -> Vec<PyStep> {
        self.0.steps.iter().map(|s| PyStep(s.clone())).collect()
    }

    /// Outcome value per seat, absolute seat order.
    #[getter]
    fn outcome(&self) -> Vec<f64> {
        self.0.outcome.values.as_slice().to_vec()
    }

    #[getter]
    fn score(&self) -> f64 {
        self.0.outcome.score
    }

    #[getter]
    fn truncated(&self) -> bool {
        self.0.truncated
    }

    #[getter]
    fn game_length(&self) -> usize {
        self.0.game_length
    }

    #[getter]
    fn seed(&self) -> u64 {
        self.0.seed
    }

    fn __len__(&self) -> usize {
        self.0.len()
    }

    fn player_steps(&self, player: &PyPlayerId) -> Vec<PyStep> {
        self.0
            .player_steps(player.0)
            .map(|s| PyStep(s.clone()))
            .collect()
    }

    fn to_training_examples(&self) -> Vec<PyTrainingExample> {
        self.0
            .to_training_examples()
            .into_iter()
            .map(PyTrainingExample)
            .collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "Trajectory(length={}, truncated={}, seed={})",
            self.0.game_length, self.0.truncated, self.0.seed
        )
    }
}

/// Python wrapper for TrainingExample.
#[pyclass(name = "TrainingExample")]
#[derive(Clone)]
pub struct PyTrainingExample(pub TrainingExample);

#[pymethods]
impl PyTrainingExample {
    #[getter]
    fn state(&self) -> PyEncodedState {
        PyEncodedState(self.0.state.clone())
    }

    #[getter]
    fn policy(&self) -> Vec<f32> {
        self.0.policy.clone()
    }

    /// Outcome per seat, slot 0 being the acting player.
    #[getter]
    fn value(&self) -> Vec<f32> {
        self.0.value.clone()
    }

    #[getter]
    fn score(&self) -> f32 {
        self.0.score
    }

    #[getter]
    fn player(&self) -> PyPlayerId {
        PyPlayerId(self.0.player)
    }

    fn state_numpy<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f32>> {
        PyArray1::from_slice_bound(py, &self.0.state.tensor)
    }

    fn policy_numpy<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f32>> {
        PyArray1::from_slice_bound(py, &self.0.policy)
    }

    fn __repr__(&self) -> String {
        format!(
            "TrainingExample(player={}, value={:?}, state_dim={})",
            self.0.player.0,
            self.0.value,
            self.0.state.len()
        )
    }
}

/// Stack per-example rows into a `[n, dim]` array.
fn stack_rows<'py, 'a>(
    py: Python<'py>,
    rows: impl Iterator<Item = &'a [f32]>,
    n: usize,
    dim: usize,
    what: &str,
) -> PyResult<Bound<'py, PyArray2<f32>>> {
    let mut flat = Vec::with_capacity(n * dim);
    for (i, row) in rows.enumerate() {
        if row.len() != dim {
            return Err(PyValueError::new_err(format!(
                "Inconsistent {what} dimension at example {i}: expected {dim}, got {}",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }
    PyArray1::from_vec_bound(py, flat)
        .reshape([n, dim])
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Python wrapper for ExperienceBuffer.
#[pyclass(name = "ExperienceBuffer")]
pub struct PyExperienceBuffer {
    inner: ExperienceBuffer,
}

#[pymethods]
impl PyExperienceBuffer {
    #[new]
    fn new(max_trajectories: usize) -> Self {
        Self {
            inner: ExperienceBuffer::new(max_trajectories),
        }
    }

    fn push(&mut self, trajectory: &PyTrajectory) {
        self.inner.push(trajectory.0.clone());
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[getter]
    fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn to_training_examples(&self) -> Vec<PyTrainingExample> {
        self.inner
            .to_training_examples()
            .into_iter()
            .map(PyTrainingExample)
            .collect()
    }

    fn sample_batch(&self, batch_size: usize, seed: u64) -> Vec<PyTrainingExample> {
        self.inner
            .sample_batch(batch_size, seed)
            .into_iter()
            .map(PyTrainingExample)
            .collect()
    }

    /// All examples as numpy arrays.
    ///
    /// Returns `(states, policies, values, scores)`:
    /// - states: [N, state_dim] float32
    /// - policies: [N, action_count] float32
    /// - values: [N, player_count] float32, perspective frame
    /// - scores: [N] float32
    #[allow(clippy::type_complexity)]
    fn to_numpy_batch<'py>(
        &self,
        py: Python<'py>,
    ) -> PyResult<(
        Bound<'py, PyArray2<f32>>,
        Bound<'py, PyArray2<f32>>,
        Bound<'py, PyArray2<f32>>,
        Bound<'py, PyArray1<f32>>,
    )> {
        let examples = self.inner.to_training_examples();
        let n = examples.len();
        let (state_dim, policy_dim, value_dim) = examples
            .first()
            .map_or((0, 0, 0), |e| (e.state.len(), e.policy.len(), e.value.len()));

        let states = stack_rows(py, examples.iter().map(|e| e.state.tensor.as_slice()), n, state_dim, "state")?;
        let policies = stack_rows(py, examples.iter().map(|e| e.policy.as_slice()), n, policy_dim, "policy")?;
        let values = stack_rows(py, examples.iter().map(|e| e.value.as_slice()), n, value_dim, "value")?;
        let scores = PyArray1::from_iter_bound(py, examples.iter().map(|e| e.score));
        Ok((states, policies, values, scores))
    }

    /// Examples serialized with bincode.
    fn to_bytes<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyBytes>> {
        let bytes = encode_examples(&self.inner.to_training_examples())
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(PyBytes::new_bound(py, &bytes))
    }

    /// Decode examples produced by `to_bytes`.
    #[staticmethod]
    fn examples_from_bytes(bytes: &[u8]) -> PyResult<Vec<PyTrainingExample>> {
        let examples = decode_examples(bytes).map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(examples.into_iter().map(PyTrainingExample).collect())
    }

    fn __repr__(&self) -> String {
        format!(
            "ExperienceBuffer(len={}, capacity={})",
            self.inner.len(),
            self.inner.capacity()
        )
    }

    fn __iter__(slf: PyRef<'_, Self>) -> PyResult<Py<PyTrajectoryIterator>> {
        let trajectories: Vec<PyTrajectory> = slf
            .inner
            .iter()
            .map(|t| PyTrajectory(t.clone()))
            .collect();
        Py::new(
            slf.py(),
            PyTrajectoryIterator {
                trajectories,
                index: 0,
            },
        )
    }
}

/// Iterator over trajectories in an ExperienceBuffer.
#[pyclass]
pub struct PyTrajectoryIterator {
    trajectories: Vec<PyTrajectory>,
    index: usize,
}

#[pymethods]
impl PyTrajectoryIterator {
    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(mut slf: PyRefMut<'_, Self>) -> Option<PyTrajectory> {
        if slf.index < slf.trajectories.len() {
            let traj = slf.trajectories[slf.index].clone();
            slf.index += 1;
            Some(traj)
        } else {
            None
        }
    }
}
