//! Evaluator bindings for Python.

use numpy::PyArray1;
use pyo3::prelude::*;
use tracing::warn;

use crate::error::EvaluatorError;
use crate::nn::{EncodedState, Evaluation, Evaluator};

/// Python wrapper for EncodedState.
#[pyclass(name = "EncodedState")]
#[derive(Clone, Debug)]
pub struct PyEncodedState(pub EncodedState);

#[pymethods]
impl PyEncodedState {
    #[new]
    fn new(tensor: Vec<f32>, shape: Vec<usize>) -> Self {
        Self(EncodedState::new(tensor, shape))
    }

    #[staticmethod]
    fn zeros(shape: Vec<usize>) -> Self {
        Self(EncodedState::zeros(shape))
    }

    #[getter]
    fn tensor(&self) -> Vec<f32> {
        self.0.tensor.clone()
    }

    #[getter]
    fn shape(&self) -> Vec<usize> {
        self.0.shape.clone()
    }

    fn __len__(&self) -> usize {
        self.0.len()
    }

    /// Tensor as a flat numpy array.
    fn to_numpy<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f32>> {
        PyArray1::from_slice_bound(py, &self.0.tensor)
    }

    fn __repr__(&self) -> String {
        format!("EncodedState(shape={:?}, len={})", self.0.shape, self.0.len())
    }
}

/// Evaluator backed by a Python callable.
///
/// The callable receives a list of `EncodedState` and returns one
/// `(policy, values, score)` tuple per state. `values` are in the
/// perspective frame of the player to move (slot 0 = that player). With
/// `log_policy=True` the policy is read as log-probabilities.
#[pyclass(name = "Evaluator")]
pub struct PyEvaluator {
    callback: PyObject,
    action_count: usize,
    player_count: usize,
    log_policy: bool,
}

#[pymethods]
impl PyEvaluator {
    #[new]
    #[pyo3(signature = (callback, action_count, player_count = 2, log_policy = false))]
    fn new(callback: PyObject, action_count: usize, player_count: usize, log_policy: bool) -> Self {
        Self {
            callback,
            action_count,
            player_count,
            log_policy,
        }
    }

    /// Evaluate states directly, bypassing search.
    fn evaluate_states(&self, states: Vec<PyEncodedState>) -> PyResult<Vec<(Vec<f32>, Vec<f32>, f32)>> {
        let batch: Vec<EncodedState> = states.into_iter().map(|s| s.0).collect();
        let evaluations = self
            .evaluate(&batch)
            .map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(e.to_string()))?;
        Ok(evaluations
            .into_iter()
            .map(|e| (e.policy, e.values, e.score))
            .collect())
    }

    #[getter]
    fn action_count(&self) -> usize {
        self.action_count
    }

    #[getter]
    fn player_count(&self) -> usize {
        self.player_count
    }
}

impl PyEvaluator {
    /// Second handle to the same Python callable.
    pub(crate) fn clone_ref(&self, py: Python<'_>) -> Self {
        Self {
            callback: self.callback.clone_ref(py),
            action_count: self.action_count,
            player_count: self.player_count,
            log_policy: self.log_policy,
        }
    }

    fn call(&self, py: Python<'_>, batch: &[EncodedState]) -> PyResult<Vec<Evaluation>> {
        let states: Vec<PyEncodedState> = batch.iter().cloned().map(PyEncodedState).collect();
        let result = self.callback.call1(py, (states,))?;
        let rows: Vec<(Vec<f32>, Vec<f32>, f32)> = result.extract(py)?;
        Ok(rows
            .into_iter()
            .map(|(policy, values, score)| {
                if self.log_policy {
                    Evaluation::from_log_policy(&policy, values, score)
                } else {
                    Evaluation::new(policy, values, score)
                }
            })
            .collect())
    }
}

impl Evaluator for PyEvaluator {
    fn evaluate(&self, batch: &[EncodedState]) -> Result<Vec<Evaluation>, EvaluatorError> {
        Python::with_gil(|py| {
            self.call(py, batch).map_err(|e| {
                warn!(error = %e, batch = batch.len(), "python evaluator failed");
                EvaluatorError::Failed(e.to_string())
            })
        })
    }
}
