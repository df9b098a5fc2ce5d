use rand::rngs::StdRng;
use rand::SeedableRng;
use recsys_rs::autograd::Variable;
use recsys_rs::checkpoint::{load_checkpoint, save_checkpoint};
use recsys_rs::inputs::{Inputs, MultiIndicesFieldAwareEmbedding};
use recsys_rs::losses::{BayesianPersonalizedRankingLoss, RankingLoss};
use recsys_rs::models::{CtrModel, DeepFfmConfig, DeepFieldAwareFactorizationMachineModel};
use recsys_rs::nn::Module;
use recsys_rs::optim::{AdamW, Optimizer, Sgd};
use recsys_rs::tensor::Tensor;
use recsys_rs::utils::regularize;

const FIELD_SIZES: [usize; 3] = [4, 5, 3];
const EMBED_SIZE: usize = 4;

fn build(seed: u64) -> (MultiIndicesFieldAwareEmbedding<f32>, DeepFieldAwareFactorizationMachineModel<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let inputs = MultiIndicesFieldAwareEmbedding::new(EMBED_SIZE, &FIELD_SIZES, &mut rng).unwrap();
    let config = DeepFfmConfig::new(inputs.length(), FIELD_SIZES.len(), 4, vec![16, 8]);
    let model = DeepFieldAwareFactorizationMachineModel::new(&config, &mut rng).unwrap();
    (inputs, model)
}

fn score(
    inputs: &MultiIndicesFieldAwareEmbedding<f32>,
    model: &dyn CtrModel<f32>,
    ids: &Tensor<usize, 2>,
) -> Variable<f32, 2> {
    model.forward(&inputs.forward(ids).unwrap()).unwrap()
}

/// (user, item, context) triples: clicked rows and one sampled negative per row.
fn batch() -> (Tensor<usize, 2>, Tensor<usize, 2>) {
    let pos = Tensor::new(vec![0, 1, 2, 1, 3, 0, 2, 0, 1, 3, 4, 2], [4, 3]).unwrap();
    let neg = Tensor::new(vec![0, 4, 2, 1, 2, 0, 2, 3, 1, 3, 0, 2], [4, 3]).unwrap();
    (pos, neg)
}

fn train<O: Optimizer<f32>>(optimizer: &mut O, steps: usize) -> (f32, f32) {
    let (mut inputs, mut model) = build(3);
    let (pos_ids, neg_ids) = batch();
    let loss_fn = BayesianPersonalizedRankingLoss::default();

    let mut losses = Vec::with_capacity(steps);
    for _ in 0..steps {
        inputs.zero_grad();
        model.zero_grad();

        let pos = score(&inputs, &model, &pos_ids);
        let neg = score(&inputs, &model, &neg_ids);
        let loss = loss_fn.forward(&pos, &neg).unwrap();
        loss.backward().unwrap();
        losses.push(loss.data.data()[0]);

        optimizer.step(inputs.named_parameters_mut()).unwrap();
        optimizer.step(model.named_parameters_mut()).unwrap();
    }
    (losses[0], losses[steps - 1])
}

#[test]
fn test_forward_shapes() {
    let (inputs, model) = build(0);
    let (pos_ids, _) = batch();

    let emb = inputs.forward(&pos_ids).unwrap();
    assert_eq!(emb.shape(), &[4, 9, EMBED_SIZE]);
    assert_eq!(score(&inputs, &model, &pos_ids).shape(), &[4, 1]);

    let names: Vec<String> = model.named_parameters().into_iter().map(|(n, _)| n).collect();
    assert!(names.contains(&"deep.hidden.0.weight".to_string()));
    assert!(names.contains(&"deep.output.bias".to_string()));
    assert_eq!(inputs.named_parameters().len(), FIELD_SIZES.len());
}

#[test]
fn test_out_of_vocabulary_id_is_rejected() {
    let (inputs, _) = build(0);
    let ids = Tensor::new(vec![0, 5, 0], [1, 3]).unwrap();
    assert!(inputs.forward(&ids).is_err());
}

#[test]
fn test_sgd_lowers_ranking_loss() {
    let (first, last) = train(&mut Sgd::new(0.05), 40);
    assert!(last < first, "loss went from {first} to {last}");
}

#[test]
fn test_adamw_lowers_ranking_loss() {
    let (first, last) = train(&mut AdamW::new(0.01).with_weight_decay(0.0), 60);
    assert!(last < first * 0.5, "loss went from {first} to {last}");
}

#[test]
fn test_regularized_objective_has_gradients() {
    let (inputs, model) = build(1);
    let (pos_ids, neg_ids) = batch();

    let pos = score(&inputs, &model, &pos_ids);
    let neg = score(&inputs, &model, &neg_ids);
    let ranking = BayesianPersonalizedRankingLoss::default().forward(&pos, &neg).unwrap();
    let penalty = regularize(&model.named_parameters(), 1e-3, 2.0).unwrap();
    assert!(penalty.data.data()[0] > 0.0);

    (&ranking + &penalty).unwrap().backward().unwrap();
    for (name, p) in model.named_parameters() {
        assert!(p.grad_values().is_some(), "{name}");
    }
}

#[test]
fn test_checkpoint_restores_scores() {
    let dir = tempfile::tempdir().unwrap();
    let (pos_ids, _) = batch();

    let (inputs, model) = build(10);
    save_checkpoint(dir.path().join("inputs.safetensors"), &inputs).unwrap();
    save_checkpoint(dir.path().join("model.safetensors"), &model).unwrap();
    let expected = score(&inputs, &model, &pos_ids);

    let (mut restored_inputs, restored_model) = build(11);
    let mut restored_model: Box<dyn CtrModel<f32>> = Box::new(restored_model);
    load_checkpoint(dir.path().join("inputs.safetensors"), &mut restored_inputs).unwrap();
    load_checkpoint::<f32, _, _>(dir.path().join("model.safetensors"), restored_model.as_mut()).unwrap();

    let actual = score(&restored_inputs, restored_model.as_ref(), &pos_ids);
    assert_eq!(actual.data.data(), expected.data.data());
}
