mod inverse;
mod ode;
mod quadrature;
