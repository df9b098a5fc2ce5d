use super::GraphNode;
use crate::tensor::Result;
use std::collections::HashSet;
use std::rc::Rc;

/// Runs `backward` on every node reachable from `root`, consumers before producers.
///
/// Output gradients left on the nodes by a previous pass are cleared first, then `seed`
/// writes the root's gradient. Leaf cells are never cleared here.
pub fn backward<F: FnOnce()>(root: Rc<dyn GraphNode>, seed: F) -> Result<()> {
    let order = topological_order(root);
    for node in &order {
        node.clear_grad();
    }
    seed();

    for node in order.iter().rev() {
        node.backward()?;
    }
    Ok(())
}

/// Post-order DFS: every node appears after all of its parents.
///
/// Iterative so that deep graphs (long training unrolls, big concats) cannot overflow the stack.
/// Node identity is the data pointer of the `Rc`.
fn topological_order(root: Rc<dyn GraphNode>) -> Vec<Rc<dyn GraphNode>> {
    let mut order = Vec::new();
    let mut visited: HashSet<*const ()> = HashSet::new();
    let mut stack: Vec<(Rc<dyn GraphNode>, bool)> = vec![(root, false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        let ptr = Rc::as_ptr(&node) as *const ();
        if !visited.insert(ptr) {
            continue;
        }
        let parents = node.parents();
        stack.push((node, true));
        for parent in parents {
            if !visited.contains(&(Rc::as_ptr(&parent) as *const ())) {
                stack.push((parent, false));
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use crate::autograd::Variable;
    use crate::tensor::Tensor;

    #[test]
    fn test_diamond_graph_visits_shared_node_once() {
        // s = a + b is consumed twice: y = s * s
        // dy/da = 2s = 10
        let a = Variable::new(Tensor::<f32, 0>::new(vec![2.0], []).unwrap());
        let b = Variable::new(Tensor::<f32, 0>::new(vec![3.0], []).unwrap());
        let s = (&a + &b).unwrap();
        let y = (&s * &s).unwrap();

        y.backward().unwrap();
        assert_eq!(a.gradient().unwrap().data(), &[10.0]);
        assert_eq!(b.gradient().unwrap().data(), &[10.0]);
    }

    #[test]
    fn test_repeated_backward_accumulates_only_at_leaves() {
        let x = Variable::new(Tensor::<f64, 1>::new(vec![1.0], [1]).unwrap());
        let s = x.scale(2.0);

        s.sum_all().backward().unwrap();
        assert_eq!(s.gradient().unwrap().data(), &[1.0]);
        s.sum_all().backward().unwrap();
        // the intermediate gradient is per pass, the leaf sums both passes
        assert_eq!(s.gradient().unwrap().data(), &[1.0]);
        assert_eq!(x.gradient().unwrap().data(), &[4.0]);

        let y = (&s * &s).unwrap().sum_all();
        y.backward().unwrap();
        y.backward().unwrap();
        // d/dx (2x)^2 = 8x, twice on top of the earlier 4
        assert_eq!(x.gradient().unwrap().data(), &[20.0]);
    }

    #[test]
    fn test_long_chain() {
        // y = x + x + ... (1000 times) on a chain of nodes
        let x = Variable::new(Tensor::<f64, 0>::new(vec![1.0], []).unwrap());
        let mut y = x.clone();
        for _ in 0..1000 {
            y = (&y + &x).unwrap();
        }
        y.backward().unwrap();
        assert_eq!(x.gradient().unwrap().data(), &[1001.0]);
    }
}
