use axum::{
    handler::Handler,
    routing::{on, MethodFilter},
    Router,
};



pub fn main_router<STATE>(components: Vec<(String, Router<STATE>)>, state: STATE) -> Router
where
    STATE: Clone + Send + Sync + 'static
{
    let mut app = Router::<STATE>::new();

    for (_, router) in components {
        app = app.merge(router);
    }

    app.with_state(state)
}



/// One route table entry: `method path -> handler`. Entries sharing a path
/// are merged into a single method router by `main_router`.
pub fn route_builder<T, S>(
    method: MethodFilter,
    path: &str,
    handler: impl Handler<T, S> + Clone + Send + Sync + 'static
) -> (String, Router<S>)
where
    T: 'static,
    S: Clone + Send + Sync + 'static,
{
    let app = Router::<S>::new();
    (path.to_string(), app.route(path, on(method, handler)))
}
